//! Lease registry error types.

use thiserror::Error;

/// Result type alias for lease operations.
pub type LeaseResult<T> = Result<T, LeaseError>;

/// Errors that can occur while admitting leases.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LeaseError {
    #[error("worker already leased: {0}")]
    AlreadyLeased(String),

    #[error("lease registry is shut down; cannot admit {0}")]
    ShutDown(String),

    #[error("lease duration for {0} must be greater than zero")]
    ZeroDuration(String),

    #[error("lease reaper needs a tokio runtime")]
    NoRuntime,
}
