//! leastload-sim — drives a balancer with synthetic request traffic.
//!
//! Each request is issued by its own tokio task after a random stagger. A
//! served request holds its worker for a random work time and then releases
//! it; requests that find no live worker are counted as unserved.

pub mod simulation;

pub use simulation::{Simulation, Summary};
