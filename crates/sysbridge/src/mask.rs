//! Severity filter masks.

use std::fmt;

use sysbridge_sys::{MAX_LEVEL, MIN_LEVEL, log_mask, log_upto};

use crate::error::{BridgeError, BridgeResult};

/// A severity filter: bit `n` set means level `n` is delivered.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SeverityMask(i32);

impl SeverityMask {
    /// Mask delivering exactly `level`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Argument`] if `level` is not a syslog level.
    pub fn exactly(level: i32) -> BridgeResult<Self> {
        check_level(level)?;
        Ok(Self(log_mask(level)))
    }

    /// Mask delivering every level up to and including `level`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Argument`] if `level` is not a syslog level.
    pub fn up_to(level: i32) -> BridgeResult<Self> {
        check_level(level)?;
        Ok(Self(log_upto(level)))
    }

    /// Raw bits as passed to `setlogmask`.
    #[must_use]
    pub fn bits(self) -> i32 {
        self.0
    }

    /// Whether a message at `priority` passes this mask. Facility bits in
    /// `priority` are ignored.
    #[must_use]
    pub fn allows(self, priority: i32) -> bool {
        self.0 & log_mask(priority & MAX_LEVEL) != 0
    }
}

impl fmt::Debug for SeverityMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeverityMask({:#010b})", self.0)
    }
}

fn check_level(level: i32) -> BridgeResult<()> {
    if (MIN_LEVEL..=MAX_LEVEL).contains(&level) {
        Ok(())
    } else {
        Err(BridgeError::Argument(format!(
            "mask level {level} is outside {MIN_LEVEL}..={MAX_LEVEL}"
        )))
    }
}
