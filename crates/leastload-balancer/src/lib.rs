//! leastload-balancer — request routing across a worker pool.
//!
//! [`LeastLoadedBalancer`] sends each request to the live worker with the
//! fewest in-flight requests. Worker liveness comes from a lease registry
//! that retires workers on its own schedule; the balancer does not hear
//! about expiries. Instead, each selection pops candidates from the load
//! ranking and throws away any whose lease is gone before dispatching to the
//! first live one.
//!
//! # Architecture
//!
//! ```text
//! LeastLoadedBalancer
//!   ├── WorkerRegistry    (id → Worker, read-only, no lock)
//!   ├── SharedLoadRanking (one mutex; held across pop → check → dispatch → re-rank)
//!   └── LeaseRegistry     (own mutex; only is_live() is consulted)
//! ```
//!
//! [`RoundRobinBalancer`] cycles through a fixed worker list and ignores
//! leases. Both implement [`LoadBalancer`].

pub mod error;
pub mod least_loaded;
pub mod round_robin;
pub mod status;
pub mod traits;

pub use error::{BalancerError, BalancerResult};
pub use least_loaded::LeastLoadedBalancer;
pub use round_robin::RoundRobinBalancer;
pub use status::StatusSnapshot;
pub use traits::LoadBalancer;
