//! leastload-lease — time-bounded worker leases.
//!
//! A worker is admitted once with a lease duration and stays live until the
//! reaper retires it. Leases are never renewed: expiry is final.
//!
//! # Architecture
//!
//! ```text
//! LeaseRegistry
//!   ├── Mutex<LeaseTable>
//!   │   ├── leases:   worker_id → Lease (granted_at, duration, seq)
//!   │   └── schedule: min-heap of ExpiryCheck (due, seq, worker_id)
//!   └── reaper task (one per registry)
//!       └── sleep until the earliest check is due → fire → repeat
//! ```
//!
//! `is_live` reads the table only. A lease that has elapsed but whose check
//! has not fired yet still reads as live; the lag is bounded by how late the
//! reaper wakes.
//!
//! When a fired check leaves the table empty the registry shuts itself
//! down: no further admissions are accepted.

pub mod error;
pub mod registry;
mod table;

pub use error::{LeaseError, LeaseResult};
pub use registry::{LeaseRegistry, LeaseView};
pub use table::Released;
