//! System log backends.
//!
//! [`LibcSyslog`] talks to the process-wide C logger. [`RecordingSyslog`]
//! keeps everything in memory; tests and the CLI's dry-run mode use it.

use std::ffi::CStr;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::mask::SeverityMask;

/// The four primitives of the system logger.
///
/// `write` is called from worker threads while the other methods run on the
/// host thread, so implementations must be thread safe.
pub trait SyslogBackend: Send + Sync {
    /// Connect under `ident`. The backend keeps its own copy of the name.
    fn open(&self, ident: &CStr, option: i32, facility: i32);

    /// Deliver `message` at `priority` if the current mask allows it.
    fn write(&self, priority: i32, message: &CStr);

    /// Disconnect. Closing when not open is harmless.
    fn close(&self);

    /// Install `mask` and return the previous mask bits.
    fn set_mask(&self, mask: SeverityMask) -> i32;
}

/// The C library's `syslog`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibcSyslog;

impl SyslogBackend for LibcSyslog {
    fn open(&self, ident: &CStr, option: i32, facility: i32) {
        sysbridge_sys::open_log(ident.to_owned(), option, facility);
    }

    fn write(&self, priority: i32, message: &CStr) {
        sysbridge_sys::write_log(priority, message);
    }

    fn close(&self) {
        sysbridge_sys::close_log();
    }

    fn set_mask(&self, mask: SeverityMask) -> i32 {
        sysbridge_sys::set_log_mask(mask.bits())
    }
}

/// One call observed by [`RecordingSyslog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyslogCall {
    /// `open` with the stored identifier.
    Open {
        /// Identifier.
        ident: String,
        /// Option flags.
        option: i32,
        /// Facility.
        facility: i32,
    },
    /// A write that passed the mask.
    Write {
        /// Priority including facility bits.
        priority: i32,
        /// Message text.
        message: String,
    },
    /// `close`.
    Close,
    /// `set_mask`.
    SetMask {
        /// Mask installed.
        mask: i32,
        /// Mask returned as previous.
        previous: i32,
    },
}

#[derive(Debug)]
struct Recorded {
    calls: Vec<SyslogCall>,
    mask: i32,
    filtered: usize,
}

#[derive(Debug, Default)]
struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
}

/// In-memory logger that records every call.
///
/// It models the process mask like the C library: all levels enabled
/// initially, writes filtered by it. A gated recorder blocks every `write`
/// until [`GateHandle::open`] is called.
#[derive(Debug)]
pub struct RecordingSyslog {
    recorded: Mutex<Recorded>,
    gate: Option<Arc<Gate>>,
}

/// Releases the writes held back by a gated [`RecordingSyslog`].
#[derive(Debug, Clone)]
pub struct GateHandle(Arc<Gate>);

impl GateHandle {
    /// Let all current and future writes through.
    pub fn open(&self) {
        let mut open = self.0.open.lock().unwrap_or_else(PoisonError::into_inner);
        *open = true;
        self.0.opened.notify_all();
    }
}

impl Default for RecordingSyslog {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSyslog {
    /// Initial mask of a fresh process: every level enabled.
    pub const INITIAL_MASK: i32 = 0xff;

    /// An ungated recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            recorded: Mutex::new(Recorded {
                calls: Vec::new(),
                mask: Self::INITIAL_MASK,
                filtered: 0,
            }),
            gate: None,
        }
    }

    /// A recorder whose writes wait for the returned gate.
    #[must_use]
    pub fn gated() -> (Self, GateHandle) {
        let gate = Arc::new(Gate::default());
        let recorder = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::new()
        };
        (recorder, GateHandle(gate))
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<SyslogCall> {
        self.lock().calls.clone()
    }

    /// `(priority, message)` of every delivered write, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<(i32, String)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                SyslogCall::Write { priority, message } => Some((*priority, message.clone())),
                _ => None,
            })
            .collect()
    }

    /// Number of writes dropped by the mask.
    #[must_use]
    pub fn filtered(&self) -> usize {
        self.lock().filtered
    }

    /// The mask currently installed.
    #[must_use]
    pub fn mask(&self) -> i32 {
        self.lock().mask
    }

    fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            let open = gate.open.lock().unwrap_or_else(PoisonError::into_inner);
            let _open = gate
                .opened
                .wait_while(open, |open| !*open)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl SyslogBackend for RecordingSyslog {
    fn open(&self, ident: &CStr, option: i32, facility: i32) {
        self.lock().calls.push(SyslogCall::Open {
            ident: ident.to_string_lossy().into_owned(),
            option,
            facility,
        });
    }

    fn write(&self, priority: i32, message: &CStr) {
        self.wait_for_gate();
        let mut recorded = self.lock();
        let level = priority & sysbridge_sys::MAX_LEVEL;
        if recorded.mask & sysbridge_sys::log_mask(level) == 0 {
            recorded.filtered = recorded.filtered.saturating_add(1);
            return;
        }
        recorded.calls.push(SyslogCall::Write {
            priority,
            message: message.to_string_lossy().into_owned(),
        });
    }

    fn close(&self) {
        self.lock().calls.push(SyslogCall::Close);
    }

    fn set_mask(&self, mask: SeverityMask) -> i32 {
        let mut recorded = self.lock();
        let previous = recorded.mask;
        recorded.mask = mask.bits();
        recorded.calls.push(SyslogCall::SetMask {
            mask: mask.bits(),
            previous,
        });
        previous
    }
}
