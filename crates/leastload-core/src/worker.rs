//! Worker capability and the id → worker registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::error::{CoreError, CoreResult, WorkerError};
use crate::types::Request;

/// Something that can execute a request.
///
/// Dispatch is a fast, synchronous, in-process call: balancers invoke it
/// while holding their selection lock.
pub trait Worker: Send + Sync {
    /// Stable identifier, unique within a registry.
    fn id(&self) -> &str;

    /// Execute a request.
    fn handle(&self, request: &Request) -> Result<(), WorkerError>;
}

/// A worker that accepts everything and counts what it saw.
#[derive(Debug)]
pub struct SimulatedWorker {
    id: String,
    handled: AtomicU64,
}

impl SimulatedWorker {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handled: AtomicU64::new(0),
        }
    }

    /// Number of requests handled so far.
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }
}

impl Worker for SimulatedWorker {
    fn id(&self) -> &str {
        &self.id
    }

    fn handle(&self, request: &Request) -> Result<(), WorkerError> {
        self.handled.fetch_add(1, Ordering::Relaxed);
        debug!(worker = %self.id, request = %request, "request handled");
        Ok(())
    }
}

/// Read-only map from worker id to the worker that executes requests.
///
/// Built once and never mutated, so it can be shared without locking.
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    workers: HashMap<String, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    /// Build a registry, rejecting duplicate ids.
    pub fn new(workers: impl IntoIterator<Item = Arc<dyn Worker>>) -> CoreResult<Self> {
        let mut map = HashMap::new();
        for worker in workers {
            let id = worker.id().to_string();
            if map.insert(id.clone(), worker).is_some() {
                return Err(CoreError::DuplicateWorker(id));
            }
        }
        Ok(Self { workers: map })
    }

    /// Convenience constructor: one [`SimulatedWorker`] per id.
    pub fn simulated<I, S>(ids: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            ids.into_iter()
                .map(|id| Arc::new(SimulatedWorker::new(id)) as Arc<dyn Worker>),
        )
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Worker>> {
        self.workers.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.workers.contains_key(id)
    }

    /// Worker ids in ascending order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl std::fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("workers", &self.ids())
            .finish()
    }
}
