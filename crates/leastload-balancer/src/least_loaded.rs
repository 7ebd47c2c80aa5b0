//! Least-loaded selection over leased workers.

use std::time::Duration;

use leastload_core::{BalancerKind, ExpiryPolicy, LeaseConfig, Request, WorkerRegistry};
use leastload_lease::LeaseRegistry;
use leastload_ranking::SharedLoadRanking;
use tracing::{debug, info, warn};

use crate::error::BalancerResult;
use crate::status::StatusSnapshot;
use crate::traits::LoadBalancer;

/// Routes each request to the live worker with the fewest in-flight requests.
///
/// Ties go to the smallest worker id. Workers whose lease has been reaped are
/// dropped from the ranking the next time selection reaches them.
pub struct LeastLoadedBalancer {
    workers: WorkerRegistry,
    ranking: SharedLoadRanking,
    leases: LeaseRegistry,
}

impl LeastLoadedBalancer {
    /// Build a balancer over `workers`, leasing each for a random duration
    /// drawn from `config`.
    ///
    /// Must be called inside a tokio runtime; the lease reaper runs on it.
    pub fn new(workers: WorkerRegistry, config: &LeaseConfig) -> BalancerResult<Self> {
        config.validate()?;
        let mut rng = rand::thread_rng();
        Self::with_lease_fn(workers, config.policy, |_| config.sample(&mut rng))
    }

    /// Build a balancer whose lease durations come from `lease_for`.
    pub fn with_lease_fn<F>(
        workers: WorkerRegistry,
        policy: ExpiryPolicy,
        mut lease_for: F,
    ) -> BalancerResult<Self>
    where
        F: FnMut(&str) -> Duration,
    {
        let leases = LeaseRegistry::start(policy)?;
        let ranking = SharedLoadRanking::new();
        for id in workers.ids() {
            leases.admit(&id, lease_for(&id))?;
            ranking.add_worker(&id);
        }
        info!(workers = workers.len(), ?policy, "least-loaded balancer ready");
        Ok(Self {
            workers,
            ranking,
            leases,
        })
    }

    /// Pick the least-loaded live worker, dispatch `request` to it and count
    /// it as in flight. Returns `None` once no live worker remains.
    pub fn serve_request(&self, request: &Request) -> Option<String> {
        let mut ranking = self.ranking.lock();
        while let Some(mut candidate) = ranking.pop_minimum() {
            if !self.leases.is_live(&candidate.worker_id) {
                debug!(
                    worker = %candidate.worker_id,
                    count = candidate.count,
                    "discarding worker with expired lease"
                );
                continue;
            }
            let Some(worker) = self.workers.get(&candidate.worker_id) else {
                warn!(worker = %candidate.worker_id, "ranked worker missing from registry");
                continue;
            };

            if let Err(e) = worker.handle(request) {
                warn!(worker = %candidate.worker_id, error = %e, "dispatch failed");
            }
            let worker_id = candidate.worker_id.clone();
            candidate.count += 1;
            ranking.push(candidate);
            return Some(worker_id);
        }
        drop(ranking);

        warn!(request = %request, "no live worker available");
        None
    }

    /// Count one more request on `worker_id` if it is still tracked.
    pub fn record_dispatch(&self, worker_id: &str) {
        self.adjust(worker_id, 1);
    }

    /// Count one request on `worker_id` as complete if it is still tracked.
    pub fn release(&self, worker_id: &str) {
        self.adjust(worker_id, -1);
    }

    fn adjust(&self, worker_id: &str, delta: i64) {
        let mut ranking = self.ranking.lock();
        if ranking.contains(worker_id) {
            ranking.update_count(worker_id, delta);
        } else {
            debug!(worker = %worker_id, delta, "ignoring count change for untracked worker");
        }
    }

    pub fn status_snapshot(&self) -> StatusSnapshot {
        let ranking = self.ranking.entries();
        let leases = self.leases.snapshot();
        StatusSnapshot { ranking, leases }
    }

    /// In-flight count for `worker_id`, if tracked.
    pub fn count_of(&self, worker_id: &str) -> Option<i64> {
        self.ranking.count_of(worker_id)
    }

    /// Number of workers still in the ranking, stale ones included.
    pub fn tracked(&self) -> usize {
        self.ranking.len()
    }

    pub fn leases(&self) -> &LeaseRegistry {
        &self.leases
    }

    pub fn workers(&self) -> &WorkerRegistry {
        &self.workers
    }

    /// Stop admitting leases. Existing leases still expire on schedule.
    pub fn shutdown(&self) {
        self.leases.shutdown();
    }
}

impl LoadBalancer for LeastLoadedBalancer {
    fn serve_request(&self, request: &Request) -> Option<String> {
        LeastLoadedBalancer::serve_request(self, request)
    }

    fn record_dispatch(&self, worker_id: &str) {
        LeastLoadedBalancer::record_dispatch(self, worker_id);
    }

    fn release(&self, worker_id: &str) {
        LeastLoadedBalancer::release(self, worker_id);
    }

    fn status_report(&self) -> String {
        self.status_snapshot().to_string()
    }

    fn name(&self) -> &'static str {
        BalancerKind::LeastLoaded.label()
    }
}

impl std::fmt::Debug for LeastLoadedBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeastLoadedBalancer")
            .field("workers", &self.workers.len())
            .field("tracked", &self.tracked())
            .field("leases", &self.leases)
            .finish()
    }
}
