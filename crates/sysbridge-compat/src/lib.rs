//! Sysbridge Compat - one vocabulary over both host embedding API generations.
//!
//! The host runtime ships two incompatible native APIs. The `legacy`
//! generation reaches the isolate implicitly and has callbacks *return*
//! their result handle; the `modern` generation takes the isolate explicitly
//! and has callbacks write into a return-value slot. This crate picks one at
//! build time (feature `legacy-api`, otherwise modern) and exposes the same
//! items either way, so code above it is written once.
//!
//! Every native callback body follows the same shape:
//!
//! ```rust
//! use sysbridge_compat::{ArgumentType, ReturnType, ReturnableHandleScope};
//!
//! fn answer(args: &ArgumentType) -> ReturnType {
//!     let scope = ReturnableHandleScope::new(args);
//!     if scope.len() > 0 {
//!         let first = scope.arg(0).to_int32();
//!         return scope.ret_int(first);
//!     }
//!     scope.ret_int(42)
//! }
//! # let _ = answer;
//! ```
//!
//! Nothing here validates arguments or holds state; host failures propagate
//! untouched.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

#[cfg(feature = "legacy-api")]
mod legacy;
#[cfg(feature = "legacy-api")]
pub use legacy::*;

#[cfg(not(feature = "legacy-api"))]
mod modern;
#[cfg(not(feature = "legacy-api"))]
pub use modern::*;

mod persistent;

pub use persistent::Persistent;
pub use sysbridge_host::{Isolate, Local, Value, kind};
