//! leastload-core — shared vocabulary for the leastload workspace.
//!
//! Holds the value objects that flow through a balancer (requests, worker
//! ids), the [`Worker`] capability a balancer dispatches to, the read-only
//! [`WorkerRegistry`], and `leastload.toml` parsing.

pub mod config;
pub mod error;
pub mod naming;
pub mod types;
pub mod worker;

pub use config::{LeaseConfig, LeastLoadConfig, SimulationConfig};
pub use error::{CoreError, CoreResult, WorkerError};
pub use naming::worker_names;
pub use types::*;
pub use worker::{SimulatedWorker, Worker, WorkerRegistry};
