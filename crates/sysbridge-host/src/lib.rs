//! Sysbridge Host - a minimal single-threaded embedding runtime.
//!
//! This crate provides the host side of the native module boundary:
//! - A value space ([`Value`], [`Object`], [`Function`], [`External`])
//! - An [`Isolate`] owning scoped and persistent handles, pending exceptions
//!   and an event loop with a blocking worker pool
//! - Two embedding API generations, [`legacy`] and [`modern`], which differ in
//!   callback signatures, return conventions and how the isolate is reached
//!
//! # Example
//!
//! ```rust
//! use sysbridge_host::{Isolate, Value, modern};
//!
//! fn answer(info: &modern::FunctionCallbackInfo) {
//!     info.get_return_value().set_int32(42);
//! }
//!
//! # fn main() -> Result<(), sysbridge_host::HostError> {
//! let isolate = Isolate::new()?;
//! let function = {
//!     let _scope = modern::HandleScope::new(&isolate);
//!     let undefined = modern::undefined(&isolate);
//!     let template = modern::FunctionTemplate::new(&isolate, answer, undefined);
//!     isolate.value(template.get_function(&isolate))
//! };
//! let result = isolate.call_function(&function, &[]).unwrap_or_default();
//! assert_eq!(result.to_int32(), 42);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod legacy;
pub mod modern;

mod error;
mod handle;
mod isolate;
mod value;

pub use error::{HostError, HostResult};
pub use handle::{Local, PersistentId, kind};
pub use isolate::{EnterGuard, Isolate, fatal_error};
pub use value::{Exception, External, Function, Object, ScriptFn, Value};
