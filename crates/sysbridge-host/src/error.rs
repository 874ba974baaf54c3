//! Host runtime error types.

use thiserror::Error;

/// Errors raised while setting up a host isolate.
#[derive(Debug, Error)]
pub enum HostError {
    /// The event loop or its worker pool could not be created.
    #[error("failed to start event loop: {0}")]
    EventLoop(#[from] std::io::Error),
}

/// Result type for host setup.
pub type HostResult<T> = Result<T, HostError>;
