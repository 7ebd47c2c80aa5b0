//! Least-loaded balancer behaviour, with the tokio clock paused so lease
//! expiry is deterministic.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use leastload_balancer::{BalancerError, LeastLoadedBalancer, LoadBalancer};
use leastload_core::{
    CoreError, ExpiryPolicy, LeaseConfig, Request, SimulatedWorker, Worker, WorkerError,
    WorkerRegistry,
};

const LONG: u64 = 60_000;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn req(n: usize) -> Request {
    Request::new(n.to_string(), "GET")
}

/// Balancer over `(id, lease_ms)` pairs.
fn balancer(leases: &[(&str, u64)]) -> LeastLoadedBalancer {
    balancer_with_policy(leases, ExpiryPolicy::Owner)
}

fn balancer_with_policy(leases: &[(&str, u64)], policy: ExpiryPolicy) -> LeastLoadedBalancer {
    let durations: HashMap<String, u64> = leases
        .iter()
        .map(|(id, lease)| (id.to_string(), *lease))
        .collect();
    let registry = WorkerRegistry::simulated(leases.iter().map(|(id, _)| *id)).unwrap();
    LeastLoadedBalancer::with_lease_fn(registry, policy, |id| ms(durations[id])).unwrap()
}

struct FailingWorker;

impl Worker for FailingWorker {
    fn id(&self) -> &str {
        "broken"
    }

    fn handle(&self, request: &Request) -> Result<(), WorkerError> {
        Err(WorkerError {
            worker: "broken".to_string(),
            request: request.to_string(),
            reason: "always fails".to_string(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn least_loaded_worker_is_chosen() {
    let lb = balancer(&[("a", LONG), ("b", LONG), ("c", LONG)]);
    for _ in 0..3 {
        lb.record_dispatch("a");
    }
    for _ in 0..2 {
        lb.record_dispatch("b");
    }
    assert_eq!(lb.serve_request(&req(1)).as_deref(), Some("c"));

    // c now sits at 1; one more ties it with b, and b wins on id.
    lb.record_dispatch("c");
    assert_eq!(lb.serve_request(&req(2)).as_deref(), Some("b"));
}

#[tokio::test(start_paused = true)]
async fn fresh_pool_picks_smallest_id() {
    let lb = balancer(&[("d", LONG), ("b", LONG), ("a", LONG), ("c", LONG)]);
    assert_eq!(lb.serve_request(&req(1)).as_deref(), Some("a"));
}

#[tokio::test(start_paused = true)]
async fn equal_load_picks_smallest_id() {
    let lb = balancer(&[("a", LONG), ("b", LONG), ("c", LONG), ("d", LONG)]);
    for id in ["a", "b", "c", "d"] {
        lb.record_dispatch(id);
    }
    assert_eq!(lb.serve_request(&req(1)).as_deref(), Some("a"));
}

#[tokio::test(start_paused = true)]
async fn serving_counts_the_request() {
    let lb = balancer(&[("a", LONG), ("b", LONG)]);
    let picks: Vec<String> = (0..4).filter_map(|n| lb.serve_request(&req(n))).collect();
    assert_eq!(picks, vec!["a", "b", "a", "b"]);
    assert_eq!(lb.count_of("a"), Some(2));
    assert_eq!(lb.count_of("b"), Some(2));
    assert_eq!(lb.tracked(), 2);
}

#[tokio::test(start_paused = true)]
async fn request_reaches_the_worker() {
    let a = Arc::new(SimulatedWorker::new("a"));
    let registry = WorkerRegistry::new([a.clone() as Arc<dyn Worker>]).unwrap();
    let lb = LeastLoadedBalancer::with_lease_fn(registry, ExpiryPolicy::Owner, |_| ms(LONG))
        .unwrap();

    lb.serve_request(&req(1));
    lb.serve_request(&req(2));
    assert_eq!(a.handled(), 2);
}

#[tokio::test(start_paused = true)]
async fn worker_failure_still_counts_dispatch() {
    let registry = WorkerRegistry::new([Arc::new(FailingWorker) as Arc<dyn Worker>]).unwrap();
    let lb = LeastLoadedBalancer::with_lease_fn(registry, ExpiryPolicy::Owner, |_| ms(LONG))
        .unwrap();

    assert_eq!(lb.serve_request(&req(1)).as_deref(), Some("broken"));
    assert_eq!(lb.count_of("broken"), Some(1));
}

#[tokio::test(start_paused = true)]
async fn expired_worker_is_skipped_and_dropped() {
    let lb = balancer(&[("a", 1_000), ("b", LONG)]);
    lb.record_dispatch("b");

    tokio::time::sleep(ms(1_100)).await;
    assert!(!lb.leases().is_live("a"));
    // Still ranked until a selection reaches it.
    assert_eq!(lb.tracked(), 2);

    assert_eq!(lb.serve_request(&req(1)).as_deref(), Some("b"));
    assert_eq!(lb.tracked(), 1);
    assert_eq!(lb.count_of("a"), None);

    assert_eq!(lb.serve_request(&req(2)).as_deref(), Some("b"));
    assert_eq!(lb.count_of("b"), Some(3));
}

#[tokio::test(start_paused = true)]
async fn worker_stays_eligible_until_its_lease_ends() {
    let lb = balancer(&[("a", 1_000), ("b", LONG)]);
    tokio::time::sleep(ms(500)).await;
    assert_eq!(lb.serve_request(&req(1)).as_deref(), Some("a"));
}

#[tokio::test(start_paused = true)]
async fn empty_pool_is_exhausted() {
    let registry = WorkerRegistry::simulated(Vec::<String>::new()).unwrap();
    let lb = LeastLoadedBalancer::with_lease_fn(registry, ExpiryPolicy::Owner, |_| ms(LONG))
        .unwrap();
    assert_eq!(lb.serve_request(&req(1)), None);
}

#[tokio::test(start_paused = true)]
async fn fully_expired_pool_is_exhausted() {
    let lb = balancer(&[("a", 1_000), ("b", 2_000)]);
    tokio::time::sleep(ms(2_500)).await;

    assert_eq!(lb.serve_request(&req(1)), None);
    assert_eq!(lb.tracked(), 0);
    assert!(lb.leases().is_shut_down());
    // Stays exhausted.
    assert_eq!(lb.serve_request(&req(2)), None);
}

#[tokio::test(start_paused = true)]
async fn first_expired_policy_drains_the_pool() {
    let lb = balancer_with_policy(
        &[("a", 1_000), ("b", 1_000), ("c", LONG)],
        ExpiryPolicy::FirstExpired,
    );
    tokio::time::sleep(ms(1_100)).await;
    assert_eq!(lb.leases().len(), 1);
    assert_eq!(lb.serve_request(&req(1)).as_deref(), Some("c"));
    assert_eq!(lb.tracked(), 1);
}

#[tokio::test(start_paused = true)]
async fn release_after_expiry_is_ignored() {
    let lb = balancer(&[("a", 1_000), ("b", LONG)]);
    lb.record_dispatch("b");
    lb.record_dispatch("b");
    let id = lb.serve_request(&req(1)).unwrap();
    assert_eq!(id, "a");

    tokio::time::sleep(ms(1_100)).await;
    lb.serve_request(&req(2));
    lb.release(&id);

    assert_eq!(lb.count_of("a"), None);
    assert_eq!(lb.tracked(), 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_ids_are_ignored() {
    let lb = balancer(&[("a", LONG)]);
    lb.record_dispatch("ghost");
    lb.release("ghost");
    assert_eq!(lb.count_of("ghost"), None);
    assert_eq!(lb.tracked(), 1);
}

#[tokio::test(start_paused = true)]
async fn unmatched_release_goes_negative() {
    let lb = balancer(&[("a", LONG), ("b", LONG)]);
    lb.release("b");
    assert_eq!(lb.count_of("b"), Some(-1));
    assert_eq!(lb.serve_request(&req(1)).as_deref(), Some("b"));
}

#[tokio::test(start_paused = true)]
async fn status_snapshot_reflects_both_registries() {
    let lb = balancer(&[("a", 5_000), ("b", 3_000)]);
    lb.record_dispatch("a");
    tokio::time::sleep(ms(4_000)).await;

    let status = lb.status_snapshot();
    // b's lease is gone, but b is still ranked until selection reaches it.
    assert_eq!(status.tracked(), 2);
    assert_eq!(status.ranking[0].worker_id, "b");
    assert_eq!(status.leased(), 1);
    assert_eq!(status.leases[0].worker_id, "a");
    assert_eq!(status.in_flight(), 1);

    let report = LoadBalancer::status_report(&lb);
    assert!(report.starts_with("tracked workers: 2"));
    assert!(report.contains("leased workers: 1"));
}

#[tokio::test(start_paused = true)]
async fn config_driven_leases() {
    let config = LeaseConfig {
        min_ms: 2_000,
        max_ms: 2_000,
        policy: ExpiryPolicy::Owner,
    };
    let registry = WorkerRegistry::simulated(["a", "b", "c"]).unwrap();
    let lb = LeastLoadedBalancer::new(registry, &config).unwrap();
    assert_eq!(lb.leases().len(), 3);
    assert!(lb.leases().snapshot().iter().all(|v| v.lease_ms == 2_000));

    tokio::time::sleep(ms(2_100)).await;
    assert_eq!(lb.serve_request(&req(1)), None);
}

#[tokio::test(start_paused = true)]
async fn invalid_config_rejected() {
    let config = LeaseConfig {
        min_ms: 5_000,
        max_ms: 1_000,
        policy: ExpiryPolicy::Owner,
    };
    let registry = WorkerRegistry::simulated(["a"]).unwrap();
    let err = LeastLoadedBalancer::new(registry, &config).unwrap_err();
    assert!(matches!(err, BalancerError::Core(CoreError::InvalidConfig(_))));
}

#[test]
fn construction_needs_a_runtime() {
    let registry = WorkerRegistry::simulated(["a"]).unwrap();
    let err = LeastLoadedBalancer::new(registry, &LeaseConfig::default()).unwrap_err();
    assert!(matches!(err, BalancerError::Lease(_)));
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_lease_admission() {
    let lb = balancer(&[("a", 1_000)]);
    lb.shutdown();
    assert!(lb.leases().is_shut_down());
    assert_eq!(lb.serve_request(&req(1)).as_deref(), Some("a"));
}

#[tokio::test(start_paused = true)]
async fn trait_object_dispatch() {
    let lb: Box<dyn LoadBalancer> = Box::new(balancer(&[("a", LONG)]));
    assert_eq!(lb.name(), "least-loaded");
    let id = lb.serve_request(&req(1)).unwrap();
    lb.release(&id);
    assert!(lb.status_report().contains("a      in-flight=0"));
}

#[tokio::test(start_paused = true)]
async fn concurrent_dispatch_and_release_nets_to_zero() {
    let ids: Vec<(String, u64)> = leastload_core::worker_names(8)
        .into_iter()
        .map(|id| (id, LONG))
        .collect();
    let pairs: Vec<(&str, u64)> = ids.iter().map(|(id, l)| (id.as_str(), *l)).collect();
    let lb = Arc::new(balancer(&pairs));

    let mut handles = vec![];
    for t in 0..8 {
        let lb = lb.clone();
        handles.push(thread::spawn(move || {
            let mut served = 0;
            for n in 0..250 {
                if let Some(id) = lb.serve_request(&req(t * 1_000 + n)) {
                    served += 1;
                    lb.release(&id);
                }
            }
            served
        }));
    }
    let served: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(served, 2_000);
    let status = lb.status_snapshot();
    assert_eq!(status.tracked(), 8);
    assert_eq!(status.in_flight(), 0);
    assert!(status.ranking.iter().all(|e| e.count == 0));
}

#[tokio::test(start_paused = true)]
async fn concurrent_dispatch_spreads_load_evenly() {
    let lb = Arc::new(balancer(&[("a", LONG), ("b", LONG), ("c", LONG), ("d", LONG)]));

    let mut handles = vec![];
    for t in 0..4 {
        let lb = lb.clone();
        handles.push(thread::spawn(move || {
            for n in 0..100 {
                lb.serve_request(&req(t * 100 + n));
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    for id in ["a", "b", "c", "d"] {
        assert_eq!(lb.count_of(id), Some(100));
    }
}
