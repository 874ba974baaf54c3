//! Raw bindings for the POSIX system log (`openlog`, `syslog`, `closelog`,
//! `setlogmask`).
//!
//! This crate is the only place in the workspace that touches the C library.
//! Everything above it goes through a safe backend trait; here each call is a
//! thin wrapper. The one real invariant of the C API is that `openlog` does
//! not copy its `ident` argument. [`open_log`] therefore takes ownership of
//! the identifier and keeps it alive until the next [`open_log`].

#![cfg(unix)]
#![allow(unsafe_code)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::ffi::{CStr, CString, c_int};
use std::sync::{Mutex, PoisonError};

pub use libc::{
    LOG_ALERT, LOG_AUTH, LOG_AUTHPRIV, LOG_CONS, LOG_CRIT, LOG_CRON, LOG_DAEMON, LOG_DEBUG,
    LOG_EMERG, LOG_ERR, LOG_INFO, LOG_KERN, LOG_LOCAL0, LOG_LOCAL1, LOG_LOCAL2, LOG_LOCAL3,
    LOG_LOCAL4, LOG_LOCAL5, LOG_LOCAL6, LOG_LOCAL7, LOG_LPR, LOG_MAIL, LOG_NDELAY, LOG_NEWS,
    LOG_NOTICE, LOG_NOWAIT, LOG_ODELAY, LOG_PERROR, LOG_PID, LOG_SYSLOG, LOG_USER, LOG_UUCP,
    LOG_WARNING,
};

/// Lowest (most urgent) severity level.
pub const MIN_LEVEL: c_int = LOG_EMERG;
/// Highest (most verbose) severity level.
pub const MAX_LEVEL: c_int = LOG_DEBUG;

/// Mask selecting exactly one priority (`LOG_MASK` in `<syslog.h>`).
///
/// Callers are expected to pass a level in `MIN_LEVEL..=MAX_LEVEL`; larger
/// shifts wrap instead of invoking undefined behaviour like the C macro.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn log_mask(priority: c_int) -> c_int {
    1_i32.wrapping_shl(priority as u32)
}

/// Mask selecting all priorities up to and including `priority`
/// (`LOG_UPTO` in `<syslog.h>`).
#[must_use]
pub const fn log_upto(priority: c_int) -> c_int {
    log_mask(priority.wrapping_add(1)).wrapping_sub(1)
}

/// Identifier currently installed with `openlog`.
static IDENT: Mutex<Option<CString>> = Mutex::new(None);

/// Open the process-wide connection to the system logger.
///
/// The C library keeps `ident` by pointer, so it is stored here until it is
/// replaced by a later call.
pub fn open_log(ident: CString, option: c_int, facility: c_int) {
    let mut current = IDENT.lock().unwrap_or_else(PoisonError::into_inner);
    // SAFETY: `ident` is moved into IDENT below and its heap buffer does not
    // move, so the pointer stays valid until a later open replaces it. The
    // previous identifier is dropped only after openlog switched away from it.
    unsafe { libc::openlog(ident.as_ptr(), option, facility) };
    *current = Some(ident);
}

/// Write one message at `priority`.
///
/// The message is passed through a `"%s"` format so `%` sequences in user
/// input are never interpreted.
pub fn write_log(priority: c_int, message: &CStr) {
    // SAFETY: both pointers are valid NUL-terminated strings for the duration
    // of the call and the format consumes exactly one string argument.
    unsafe { libc::syslog(priority, c"%s".as_ptr(), message.as_ptr()) };
}

/// Close the connection opened by [`open_log`].
pub fn close_log() {
    // SAFETY: closelog takes no arguments and is safe to call when closed.
    unsafe { libc::closelog() };
}

/// Install `mask` as the process log mask and return the previous one.
///
/// A mask of `0` leaves the current mask untouched and only queries it.
pub fn set_log_mask(mask: c_int) -> c_int {
    // SAFETY: setlogmask only reads its integer argument.
    unsafe { libc::setlogmask(mask) }
}
