//! Core error types.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while assembling workers or validating configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("duplicate worker id: {0}")]
    DuplicateWorker(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Failure reported by a worker while handling a request.
///
/// Balancers never interpret this beyond logging it.
#[derive(Debug, Error)]
#[error("worker {worker} failed to handle request {request}: {reason}")]
pub struct WorkerError {
    pub worker: String,
    pub request: String,
    pub reason: String,
}
