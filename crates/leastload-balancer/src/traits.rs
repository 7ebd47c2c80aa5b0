//! The capability every balancer exposes to callers.

use leastload_core::Request;

pub trait LoadBalancer: Send + Sync {
    /// Route a request to a worker and count it as in flight there.
    ///
    /// Returns the chosen worker id, or `None` when no worker is available.
    fn serve_request(&self, request: &Request) -> Option<String>;

    /// Count one more in-flight request on `worker_id`. Unknown ids are
    /// ignored.
    fn record_dispatch(&self, worker_id: &str);

    /// Mark one request on `worker_id` as complete. Unknown ids are ignored,
    /// since the worker may have gone away since dispatch.
    fn release(&self, worker_id: &str);

    /// Human-readable state of the balancer.
    fn status_report(&self) -> String;

    fn name(&self) -> &'static str;
}
