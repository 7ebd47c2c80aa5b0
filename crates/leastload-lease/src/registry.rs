//! Lease registry: the live-worker set and its background reaper.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use leastload_core::ExpiryPolicy;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{LeaseError, LeaseResult};
use crate::table::{LeaseTable, Released};

/// Point-in-time view of one lease, for status reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseView {
    pub worker_id: String,
    pub lease_ms: u64,
    /// Negative once the lease has elapsed but has not been reaped yet.
    pub remaining_ms: i64,
}

/// State shared between the registry handle and its reaper task.
struct Shared {
    table: Mutex<LeaseTable>,
    /// Wakes the reaper when the schedule changes or on shutdown.
    wake: Notify,
    policy: ExpiryPolicy,
}

impl Shared {
    fn table(&self) -> MutexGuard<'_, LeaseTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire_due(&self, now: Instant) {
        let (released, drained) = {
            let mut table = self.table();
            let was_shut_down = table.is_shut_down();
            let released = table.fire_due(now, self.policy);
            (released, !was_shut_down && table.is_shut_down())
        };

        for Released {
            worker_id,
            lease,
            held,
        } in released
        {
            info!(
                worker = %worker_id,
                lease_ms = lease.as_millis() as u64,
                held_ms = held.as_millis() as u64,
                "lease released"
            );
        }
        if drained {
            info!("no leases remain; lease registry shut down");
        }
    }
}

/// Tracks which workers are currently leased (alive).
///
/// Each admission schedules one expiry check `duration` after admission.
/// A single reaper task owned by the registry fires checks in due order.
/// Dropping the registry stops the reaper.
pub struct LeaseRegistry {
    shared: Arc<Shared>,
    reaper: JoinHandle<()>,
}

impl LeaseRegistry {
    /// Create a registry and spawn its reaper on the current tokio runtime.
    pub fn start(policy: ExpiryPolicy) -> LeaseResult<Self> {
        let handle = Handle::try_current().map_err(|_| LeaseError::NoRuntime)?;
        let shared = Arc::new(Shared {
            table: Mutex::new(LeaseTable::default()),
            wake: Notify::new(),
            policy,
        });
        let reaper = handle.spawn(run_reaper(shared.clone()));
        debug!(?policy, "lease registry started");
        Ok(Self { shared, reaper })
    }

    /// Lease `worker_id` for `duration`, starting now.
    pub fn admit(&self, worker_id: &str, duration: Duration) -> LeaseResult<()> {
        let due = self.shared.table().admit(worker_id, duration, Instant::now())?;
        self.shared.wake.notify_one();
        debug!(
            worker = %worker_id,
            lease_ms = duration.as_millis() as u64,
            due_in_ms = due.saturating_duration_since(Instant::now()).as_millis() as u64,
            "lease admitted"
        );
        Ok(())
    }

    /// Whether `worker_id` holds a lease that has not been reaped.
    pub fn is_live(&self, worker_id: &str) -> bool {
        self.shared.table().contains(worker_id)
    }

    pub fn len(&self) -> usize {
        self.shared.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.table().is_empty()
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.shared.policy
    }

    /// Stop accepting admissions. Checks already scheduled still fire; the
    /// reaper exits once none remain.
    pub fn shutdown(&self) {
        if self.shared.table().shut_down() {
            info!("lease registry shut down");
        }
        self.shared.wake.notify_one();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.table().is_shut_down()
    }

    /// Number of expiry checks that have not fired yet.
    pub fn pending_checks(&self) -> usize {
        self.shared.table().pending_checks()
    }

    /// Whether the reaper task has exited.
    pub fn reaper_finished(&self) -> bool {
        self.reaper.is_finished()
    }

    /// Copy of all current leases in id order.
    pub fn snapshot(&self) -> Vec<LeaseView> {
        let now = Instant::now();
        let table = self.shared.table();
        table
            .leases()
            .map(|(id, lease)| LeaseView {
                worker_id: id.clone(),
                lease_ms: lease.duration().as_millis() as u64,
                remaining_ms: lease.remaining_ms(now),
            })
            .collect()
    }
}

impl Drop for LeaseRegistry {
    fn drop(&mut self) {
        self.reaper.abort();
    }
}

impl std::fmt::Debug for LeaseRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseRegistry")
            .field("policy", &self.shared.policy)
            .field("leases", &self.len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Sleep until the earliest check is due, fire it, repeat. Exits once the
/// registry is shut down and no checks remain.
async fn run_reaper(shared: Arc<Shared>) {
    loop {
        let next_due = {
            let table = shared.table();
            match table.next_due() {
                Some(due) => Some(due),
                None if table.is_shut_down() => break,
                None => None,
            }
        };

        match next_due {
            Some(due) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(due) => shared.fire_due(Instant::now()),
                    _ = shared.wake.notified() => {}
                }
            }
            None => shared.wake.notified().await,
        }
    }
    debug!("lease reaper stopped");
}
