//! Round-robin balancer.
//!
//! Cycles through a fixed worker list using an atomic counter. Leases are
//! not consulted, so every worker stays eligible for the balancer's lifetime.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use leastload_core::{BalancerKind, Request, WorkerRegistry};
use tracing::{debug, warn};

use crate::traits::LoadBalancer;

pub struct RoundRobinBalancer {
    workers: WorkerRegistry,
    /// Registry ids in sorted order; the rotation order.
    order: Vec<String>,
    counter: AtomicUsize,
    in_flight: Mutex<BTreeMap<String, i64>>,
}

impl RoundRobinBalancer {
    pub fn new(workers: WorkerRegistry) -> Self {
        let order = workers.ids();
        let in_flight = order.iter().map(|id| (id.clone(), 0)).collect();
        Self {
            workers,
            order,
            counter: AtomicUsize::new(0),
            in_flight: Mutex::new(in_flight),
        }
    }

    /// Select the next worker id in rotation. `None` if there are no workers.
    pub fn next(&self) -> Option<&str> {
        if self.order.is_empty() {
            return None;
        }
        let idx = self.counter.fetch_add(1, Ordering::Relaxed);
        Some(&self.order[idx % self.order.len()])
    }

    /// Reset the rotation to the first worker.
    pub fn reset(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }

    /// Current counter value (for diagnostics).
    pub fn current(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }

    pub fn count_of(&self, worker_id: &str) -> Option<i64> {
        self.in_flight().get(worker_id).copied()
    }

    fn in_flight(&self) -> MutexGuard<'_, BTreeMap<String, i64>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn adjust(&self, worker_id: &str, delta: i64) {
        match self.in_flight().get_mut(worker_id) {
            Some(count) => *count += delta,
            None => debug!(worker = %worker_id, delta, "ignoring count change for unknown worker"),
        }
    }
}

impl LoadBalancer for RoundRobinBalancer {
    fn serve_request(&self, request: &Request) -> Option<String> {
        let Some(worker_id) = self.next() else {
            warn!(request = %request, "no worker available");
            return None;
        };
        let worker = self.workers.get(worker_id)?;
        if let Err(e) = worker.handle(request) {
            warn!(worker = %worker_id, error = %e, "dispatch failed");
        }
        self.adjust(worker_id, 1);
        Some(worker_id.to_string())
    }

    fn record_dispatch(&self, worker_id: &str) {
        self.adjust(worker_id, 1);
    }

    fn release(&self, worker_id: &str) {
        self.adjust(worker_id, -1);
    }

    fn status_report(&self) -> String {
        let counts: Vec<(String, i64)> = self
            .in_flight()
            .iter()
            .map(|(id, count)| (id.clone(), *count))
            .collect();

        let mut report = format!("round-robin workers: {}", counts.len());
        for (id, count) in counts {
            report.push_str(&format!("\n  {id:<6} in-flight={count}"));
        }
        report
    }

    fn name(&self) -> &'static str {
        BalancerKind::RoundRobin.label()
    }
}

impl std::fmt::Debug for RoundRobinBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundRobinBalancer")
            .field("workers", &self.order)
            .field("counter", &self.current())
            .finish()
    }
}
