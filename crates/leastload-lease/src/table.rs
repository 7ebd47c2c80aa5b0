//! Lease bookkeeping, independent of any runtime.
//!
//! All time inputs are passed in, which keeps the expiry rules testable
//! without sleeping.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::time::Duration;

use leastload_core::ExpiryPolicy;
use tokio::time::Instant;

use crate::error::{LeaseError, LeaseResult};

#[derive(Debug, Clone)]
pub(crate) struct Lease {
    /// Admission sequence number, unique per table.
    seq: u64,
    granted_at: Instant,
    duration: Duration,
}

impl Lease {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.granted_at) >= self.duration
    }

    pub(crate) fn duration(&self) -> Duration {
        self.duration
    }

    /// Milliseconds until expiry; negative once elapsed but not yet reaped.
    pub(crate) fn remaining_ms(&self, now: Instant) -> i64 {
        let elapsed = now.saturating_duration_since(self.granted_at).as_millis() as i64;
        self.duration.as_millis() as i64 - elapsed
    }
}

/// A scheduled expiry check. Orders by due time, then admission order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ExpiryCheck {
    due: Instant,
    seq: u64,
    worker_id: String,
}

/// A lease removed by a fired expiry check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Released {
    pub worker_id: String,
    /// The duration the lease was granted for.
    pub lease: Duration,
    /// How long the worker was actually held before release.
    pub held: Duration,
}

#[derive(Debug, Default)]
pub(crate) struct LeaseTable {
    /// Ordered by id so the first-expired sweep is deterministic.
    leases: BTreeMap<String, Lease>,
    schedule: BinaryHeap<Reverse<ExpiryCheck>>,
    next_seq: u64,
    shut_down: bool,
}

impl LeaseTable {
    pub(crate) fn admit(
        &mut self,
        worker_id: &str,
        duration: Duration,
        now: Instant,
    ) -> LeaseResult<Instant> {
        if self.shut_down {
            return Err(LeaseError::ShutDown(worker_id.to_string()));
        }
        if duration.is_zero() {
            return Err(LeaseError::ZeroDuration(worker_id.to_string()));
        }
        if self.leases.contains_key(worker_id) {
            return Err(LeaseError::AlreadyLeased(worker_id.to_string()));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let due = now + duration;
        self.leases.insert(
            worker_id.to_string(),
            Lease {
                seq,
                granted_at: now,
                duration,
            },
        );
        self.schedule.push(Reverse(ExpiryCheck {
            due,
            seq,
            worker_id: worker_id.to_string(),
        }));
        Ok(due)
    }

    pub(crate) fn contains(&self, worker_id: &str) -> bool {
        self.leases.contains_key(worker_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.leases.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Stop accepting admissions. Returns `false` if already shut down.
    pub(crate) fn shut_down(&mut self) -> bool {
        !std::mem::replace(&mut self.shut_down, true)
    }

    pub(crate) fn pending_checks(&self) -> usize {
        self.schedule.len()
    }

    /// Due time of the earliest scheduled check.
    pub(crate) fn next_due(&self) -> Option<Instant> {
        self.schedule.peek().map(|Reverse(check)| check.due)
    }

    pub(crate) fn leases(&self) -> impl Iterator<Item = (&String, &Lease)> {
        self.leases.iter()
    }

    /// Fire every check due at or before `now`, in due order.
    ///
    /// Each fired check releases at most one lease, chosen by `policy`.
    /// After each check, an empty table shuts itself down.
    pub(crate) fn fire_due(&mut self, now: Instant, policy: ExpiryPolicy) -> Vec<Released> {
        let mut released = Vec::new();
        while self
            .schedule
            .peek()
            .is_some_and(|Reverse(check)| check.due <= now)
        {
            let Some(Reverse(check)) = self.schedule.pop() else {
                break;
            };
            if let Some(r) = self.fire(&check, now, policy) {
                released.push(r);
            }
            if self.leases.is_empty() {
                self.shut_down = true;
            }
        }
        released
    }

    fn fire(&mut self, check: &ExpiryCheck, now: Instant, policy: ExpiryPolicy) -> Option<Released> {
        let victim = match policy {
            ExpiryPolicy::Owner => self
                .leases
                .get(&check.worker_id)
                .filter(|lease| lease.seq == check.seq)
                .map(|_| check.worker_id.clone()),
            ExpiryPolicy::FirstExpired => self
                .leases
                .iter()
                .find(|(_, lease)| lease.is_expired(now))
                .map(|(id, _)| id.clone()),
        }?;

        let lease = self.leases.remove(&victim)?;
        Some(Released {
            worker_id: victim,
            lease: lease.duration,
            held: now.saturating_duration_since(lease.granted_at),
        })
    }
}
