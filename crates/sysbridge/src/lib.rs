//! Sysbridge - the system log exposed to a host runtime.
//!
//! This crate provides:
//! - A [`Channel`] owning the single connection to the system logger
//! - Asynchronous `log` requests written on worker threads, with the
//!   completion callback invoked back on the host thread
//! - Host bindings for `init`, `log`, `setMask` and `close`, written once
//!   against the compatibility layer and built for either API generation
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sysbridge::{BridgeConfig, RecordingSyslog, initialize_with};
//! use sysbridge_host::{Function, Isolate, Object, Value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let isolate = Isolate::new()?;
//! let module = Object::new();
//! let backend = Arc::new(RecordingSyslog::new());
//! initialize_with(&isolate, &module, BridgeConfig::default(), backend.clone())?;
//!
//! let args = [Value::string("myapp"), Value::Integer(0), Value::Integer(8)];
//! isolate.call_function(&module.get("init"), &args).map_err(|e| format!("{e:?}"))?;
//!
//! let done = Function::script("done", |_, _| Ok(Value::Undefined));
//! let args = [Value::Integer(6), Value::string("hello"), Value::Null, done.into()];
//! isolate.call_function(&module.get("log"), &args).map_err(|e| format!("{e:?}"))?;
//!
//! isolate.run_loop();
//! assert_eq!(backend.writes(), vec![(6, "hello".to_string())]);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::rc::Rc;
use std::sync::Arc;

use sysbridge_host::{Isolate, Object};
use tracing::info;

/// Syslog backends.
pub mod backend;
/// Host bindings for the four operations.
pub mod bindings;
/// The logging channel.
pub mod channel;
/// Bridge configuration.
pub mod config;
/// Write dispatch strategies.
pub mod dispatch;
/// Error types.
pub mod error;
/// Severity masks.
pub mod mask;
/// In-flight log requests.
pub mod request;

pub use backend::{GateHandle, LibcSyslog, RecordingSyslog, SyslogBackend, SyslogCall};
pub use channel::{Channel, ChannelState, DaemonName};
pub use config::{BridgeConfig, DispatchMode, MAX_NAME_LEN, NamePolicy};
pub use dispatch::Dispatcher;
pub use error::{BridgeError, BridgeResult, ConfigError, ConfigResult};
pub use mask::SeverityMask;
pub use request::LogRequest;

/// Name of the host API generation the bindings were built for.
pub use sysbridge_compat::API_GENERATION;

/// Module entry point: register `init`, `log`, `setMask` and `close` on
/// `target` with the default configuration and the C library's syslog.
///
/// # Errors
///
/// Returns [`BridgeError::Resource`] if the dispatcher cannot start.
pub fn initialize(isolate: &Isolate, target: &Object) -> BridgeResult<Rc<Channel>> {
    initialize_with(isolate, target, BridgeConfig::default(), Arc::new(LibcSyslog))
}

/// Module entry point with an explicit configuration and backend.
///
/// Returns the channel shared by the registered functions. It is closed
/// when the last of them and the returned handle are dropped.
///
/// # Errors
///
/// Returns [`BridgeError::Argument`] if `config` fails validation, or
/// [`BridgeError::Resource`] if the dispatcher cannot start.
pub fn initialize_with(
    isolate: &Isolate,
    target: &Object,
    config: BridgeConfig,
    backend: Arc<dyn SyslogBackend>,
) -> BridgeResult<Rc<Channel>> {
    let dispatch = config.dispatch;
    let channel = Rc::new(Channel::new(config, backend)?);
    bindings::register(isolate, target, Rc::clone(&channel));
    info!(generation = API_GENERATION, ?dispatch, "syslog module registered");
    Ok(channel)
}
