//! A `log` call in flight.
//!
//! A request is built on the host thread, moved to a worker for the write,
//! moved back, and consumed by [`LogRequest::complete`]. Nothing shares it
//! along the way.

use std::collections::TryReserveError;
use std::ffi::{CStr, CString};

use sysbridge_compat::{Persistent, new_scope};
use sysbridge_host::{Isolate, kind};
use tracing::{trace, warn};

use crate::backend::SyslogBackend;
use crate::channel::until_nul;
use crate::error::{BridgeError, BridgeResult};

/// One asynchronous log call.
#[derive(Debug)]
pub struct LogRequest {
    id: u64,
    priority: i32,
    message: CString,
    callback: Persistent<kind::Function>,
}

impl LogRequest {
    /// Bundle an owned message with its retained callback.
    #[must_use]
    pub fn new(
        id: u64,
        priority: i32,
        message: CString,
        callback: Persistent<kind::Function>,
    ) -> Self {
        Self {
            id,
            priority,
            message,
            callback,
        }
    }

    /// Identifier used in traces.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Severity, possibly combined with facility bits.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The owned message copy.
    #[must_use]
    pub fn message(&self) -> &CStr {
        &self.message
    }

    /// Perform the blocking write. Runs on a worker thread.
    pub fn write(&self, backend: &dyn SyslogBackend) {
        trace!(id = self.id, priority = self.priority, "writing log message");
        backend.write(self.priority, &self.message);
    }

    /// Invoke the completion callback with no arguments, then release it.
    /// Runs on the host thread.
    ///
    /// An exception thrown by the callback is reported to the isolate as
    /// uncaught; the callback is released either way.
    pub fn complete(self, isolate: &Isolate) {
        let Self { id, callback, .. } = self;
        let function = {
            let _scope = new_scope(isolate);
            isolate.value(callback.to_local(isolate))
        };
        match isolate.call_function(&function, &[]) {
            Ok(_) => trace!(id, "completion callback returned"),
            Err(exception) => {
                warn!(id, ?exception, "completion callback threw");
                isolate.report_uncaught_exception(exception);
            },
        }
        callback.reset(isolate);
    }
}

/// Copy `text` into an owned C string, using a fallible allocation.
/// Text after an interior NUL is dropped.
///
/// # Errors
///
/// Returns [`BridgeError::Resource`] if the buffer cannot be allocated.
pub fn copy_message(text: &str) -> BridgeResult<CString> {
    copy_with(text, Vec::try_reserve_exact)
}

fn copy_with<R>(text: &str, reserve: R) -> BridgeResult<CString>
where
    R: FnOnce(&mut Vec<u8>, usize) -> Result<(), TryReserveError>,
{
    let kept = until_nul(text).as_bytes();
    let mut buffer = Vec::new();
    reserve(&mut buffer, kept.len().saturating_add(1))
        .map_err(|e| BridgeError::Resource(format!("could not allocate enough memory: {e}")))?;
    buffer.extend_from_slice(kept);
    buffer.push(0);
    CString::from_vec_with_nul(buffer).map_err(|e| BridgeError::Argument(e.to_string()))
}
