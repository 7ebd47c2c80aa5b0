//! Lock-guarded load ranking for concurrent callers.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::ranking::{LoadRanking, WorkerLoad};

/// A [`LoadRanking`] behind a single mutex.
///
/// Each method runs inside one exclusion scope, so no caller ever sees an
/// entry that has left the heap but not the index. Callers that need several
/// steps to be atomic together (pop, check, re-insert) take the guard with
/// [`SharedLoadRanking::lock`].
#[derive(Debug, Default)]
pub struct SharedLoadRanking {
    inner: Mutex<LoadRanking>,
}

impl SharedLoadRanking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the ranking exclusively for a compound operation.
    pub fn lock(&self) -> MutexGuard<'_, LoadRanking> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_worker(&self, worker_id: &str) -> bool {
        self.lock().add_worker(worker_id)
    }

    pub fn update_count(&self, worker_id: &str, delta: i64) -> i64 {
        self.lock().update_count(worker_id, delta)
    }

    pub fn pop_minimum(&self) -> Option<WorkerLoad> {
        self.lock().pop_minimum()
    }

    pub fn remove_worker(&self, worker_id: &str) -> Option<WorkerLoad> {
        self.lock().remove_worker(worker_id)
    }

    pub fn contains(&self, worker_id: &str) -> bool {
        self.lock().contains(worker_id)
    }

    pub fn count_of(&self, worker_id: &str) -> Option<i64> {
        self.lock().count_of(worker_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of all entries in rank order, taken under one lock.
    pub fn entries(&self) -> Vec<WorkerLoad> {
        self.lock().entries()
    }
}

impl From<LoadRanking> for SharedLoadRanking {
    fn from(ranking: LoadRanking) -> Self {
        Self {
            inner: Mutex::new(ranking),
        }
    }
}
