//! Sysbridge Telemetry - diagnostic logging for sysbridge frontends.
//!
//! The engine crates only emit `tracing` events. This crate installs the
//! subscriber that renders them, so an embedder or the CLI can choose the
//! format, destination and filter.
//!
//! Diagnostics never go to the system log itself: they are about the bridge,
//! not messages from the scripts it serves.
//!
//! # Example
//!
//! ```rust,no_run
//! use sysbridge_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), sysbridge_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("sysbridge::dispatch=trace");
//! setup_logging(&config)?;
//! tracing::info!("diagnostics ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
