//! The load harness.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use leastload_balancer::{LeastLoadedBalancer, LoadBalancer, RoundRobinBalancer};
use leastload_core::{BalancerKind, LeastLoadConfig, Request, WorkerRegistry, worker_names};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info};

/// Outcome of one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub balancer: String,
    pub workers: usize,
    pub requests: usize,
    pub served: usize,
    pub unserved: usize,
    pub elapsed_ms: u64,
    /// Requests served per worker id.
    pub per_worker: BTreeMap<String, usize>,
    /// Final balancer status report.
    pub status: String,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} balancer, {} workers: {}/{} requests served ({} unserved) in {} ms",
            self.balancer, self.workers, self.served, self.requests, self.unserved, self.elapsed_ms
        )?;
        for (worker, served) in &self.per_worker {
            writeln!(f, "  {worker:<6} served={served}")?;
        }
        write!(f, "{}", self.status)
    }
}

/// Timing of one synthetic request.
#[derive(Debug, Clone, Copy)]
struct Plan {
    stagger: Duration,
    work: Duration,
}

pub struct Simulation {
    config: LeastLoadConfig,
    rng: StdRng,
}

impl Simulation {
    /// A simulation over `config`. A seed makes lease durations and request
    /// timings reproducible.
    pub fn new(config: LeastLoadConfig, seed: Option<u64>) -> anyhow::Result<Self> {
        config.validate().context("invalid simulation config")?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &LeastLoadConfig {
        &self.config
    }

    /// Build the configured balancer over freshly named simulated workers.
    ///
    /// Must be called inside a tokio runtime when leases are in play.
    pub fn build_balancer(&mut self) -> anyhow::Result<Arc<dyn LoadBalancer>> {
        let registry = WorkerRegistry::simulated(worker_names(self.config.simulation.workers))?;
        let balancer: Arc<dyn LoadBalancer> = match self.config.simulation.balancer {
            BalancerKind::LeastLoaded => {
                let lease = &self.config.lease;
                let rng = &mut self.rng;
                Arc::new(LeastLoadedBalancer::with_lease_fn(
                    registry,
                    lease.policy,
                    |_| lease.sample(rng),
                )?)
            }
            BalancerKind::RoundRobin => Arc::new(RoundRobinBalancer::new(registry)),
        };
        Ok(balancer)
    }

    fn plan(&mut self) -> Vec<Plan> {
        let sim = &self.config.simulation;
        (0..sim.requests)
            .map(|_| Plan {
                stagger: random_below(&mut self.rng, sim.max_stagger_ms),
                work: random_below(&mut self.rng, sim.max_work_ms),
            })
            .collect()
    }

    /// Issue every request, wait for all of them, and summarize.
    pub async fn run(mut self) -> anyhow::Result<Summary> {
        let balancer = self.build_balancer()?;
        let plans = self.plan();
        let sim = &self.config.simulation;
        info!(
            balancer = balancer.name(),
            workers = sim.workers,
            requests = sim.requests,
            "simulation started"
        );

        let started = Instant::now();
        let mut tasks = JoinSet::new();
        for (n, plan) in plans.into_iter().enumerate() {
            let balancer = balancer.clone();
            tasks.spawn(issue(balancer, Request::new(n.to_string(), "GET"), plan));
        }

        let mut per_worker: BTreeMap<String, usize> = BTreeMap::new();
        let mut unserved: usize = 0;
        while let Some(outcome) = tasks.join_next().await {
            match outcome.context("request task failed")? {
                Some(worker) => *per_worker.entry(worker).or_default() += 1,
                None => unserved += 1,
            }
        }

        let served: usize = per_worker.values().sum();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(served, unserved, elapsed_ms, "simulation finished");

        Ok(Summary {
            balancer: balancer.name().to_string(),
            workers: sim.workers,
            requests: sim.requests,
            served,
            unserved,
            elapsed_ms,
            per_worker,
            status: balancer.status_report(),
        })
    }
}

/// One request's lifetime: wait, get served, work, release.
async fn issue(balancer: Arc<dyn LoadBalancer>, request: Request, plan: Plan) -> Option<String> {
    tokio::time::sleep(plan.stagger).await;
    let worker = balancer.serve_request(&request);
    debug!(request = %request, status = %balancer.status_report(), "balancer status");

    let worker = worker?;
    tokio::time::sleep(plan.work).await;
    balancer.release(&worker);
    Some(worker)
}

/// Uniform duration in `0..max_ms` milliseconds; zero when `max_ms` is zero.
fn random_below(rng: &mut StdRng, max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.gen_range(0..max_ms))
}
