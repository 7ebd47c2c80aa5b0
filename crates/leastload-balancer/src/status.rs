//! Point-in-time view of a balancer's registries.

use std::fmt;

use leastload_lease::LeaseView;
use leastload_ranking::WorkerLoad;
use serde::Serialize;

/// Copy of the load ranking and the lease registry.
///
/// Each half is copied under its own lock; formatting happens afterwards.
/// The two halves may disagree: a worker can be ranked after its lease was
/// reaped, until the next selection discards it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// Tracked workers in rank order (count, then id).
    pub ranking: Vec<WorkerLoad>,
    /// Leased workers in id order.
    pub leases: Vec<LeaseView>,
}

impl StatusSnapshot {
    pub fn tracked(&self) -> usize {
        self.ranking.len()
    }

    pub fn leased(&self) -> usize {
        self.leases.len()
    }

    /// Sum of all tracked in-flight counts.
    pub fn in_flight(&self) -> i64 {
        self.ranking.iter().map(|e| e.count).sum()
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tracked workers: {}", self.tracked())?;
        for entry in &self.ranking {
            writeln!(f, "  {:<6} in-flight={}", entry.worker_id, entry.count)?;
        }
        write!(f, "leased workers: {}", self.leased())?;
        for lease in &self.leases {
            write!(
                f,
                "\n  {:<6} lease={}ms remaining={}ms",
                lease.worker_id, lease.lease_ms, lease.remaining_ms
            )?;
        }
        Ok(())
    }
}
