//! Balancer error types.

use leastload_core::CoreError;
use leastload_lease::LeaseError;
use thiserror::Error;

/// Errors raised while constructing a balancer.
///
/// Request routing itself never fails: an exhausted pool is reported as
/// `None` from [`crate::LoadBalancer::serve_request`].
#[derive(Debug, Error)]
pub enum BalancerError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("lease error: {0}")]
    Lease(#[from] LeaseError),
}

pub type BalancerResult<T> = Result<T, BalancerError>;
