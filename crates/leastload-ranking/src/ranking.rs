//! Indexed min-heap of worker loads.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

/// A worker id paired with its in-flight request count.
///
/// Ordered by `(count, worker_id)`: a strict total order, so the minimum is
/// unique and ties go to the lexicographically smallest id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerLoad {
    pub worker_id: String,
    /// May go negative when a release arrives without a matching dispatch.
    pub count: i64,
}

impl WorkerLoad {
    pub fn new(worker_id: impl Into<String>, count: i64) -> Self {
        Self {
            worker_id: worker_id.into(),
            count,
        }
    }
}

impl Ord for WorkerLoad {
    fn cmp(&self, other: &Self) -> Ordering {
        self.count
            .cmp(&other.count)
            .then_with(|| self.worker_id.cmp(&other.worker_id))
    }
}

impl PartialOrd for WorkerLoad {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Workers ranked by load, least loaded first.
///
/// Not synchronized; wrap in [`crate::SharedLoadRanking`] for concurrent use.
#[derive(Debug, Default, Clone)]
pub struct LoadRanking {
    heap: Vec<WorkerLoad>,
    /// worker_id → slot in `heap`.
    index: HashMap<String, usize>,
}

impl LoadRanking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `worker_id` at count 0.
    ///
    /// Returns `false` and leaves the existing entry untouched if the worker
    /// is already tracked.
    pub fn add_worker(&mut self, worker_id: &str) -> bool {
        self.push(WorkerLoad::new(worker_id, 0))
    }

    /// Insert an entry with an explicit count. Returns `false` if the worker
    /// is already tracked.
    pub fn push(&mut self, entry: WorkerLoad) -> bool {
        if self.index.contains_key(&entry.worker_id) {
            return false;
        }
        let slot = self.heap.len();
        self.index.insert(entry.worker_id.clone(), slot);
        self.heap.push(entry);
        self.sift_up(slot);
        true
    }

    /// Apply `delta` to a worker's count and re-rank it.
    ///
    /// An untracked worker is inserted with `delta` as its initial count.
    /// Returns the new count.
    pub fn update_count(&mut self, worker_id: &str, delta: i64) -> i64 {
        match self.index.get(worker_id).copied() {
            Some(slot) => {
                self.heap[slot].count += delta;
                let count = self.heap[slot].count;
                self.restore(slot);
                count
            }
            None => {
                self.push(WorkerLoad::new(worker_id, delta));
                delta
            }
        }
    }

    /// Remove and return the least loaded worker.
    pub fn pop_minimum(&mut self) -> Option<WorkerLoad> {
        self.remove_at(0)
    }

    /// The least loaded worker, without removing it.
    pub fn peek_minimum(&self) -> Option<&WorkerLoad> {
        self.heap.first()
    }

    /// Stop tracking a worker. No-op for unknown ids.
    pub fn remove_worker(&mut self, worker_id: &str) -> Option<WorkerLoad> {
        let slot = self.index.get(worker_id).copied()?;
        self.remove_at(slot)
    }

    pub fn contains(&self, worker_id: &str) -> bool {
        self.index.contains_key(worker_id)
    }

    pub fn count_of(&self, worker_id: &str) -> Option<i64> {
        self.index.get(worker_id).map(|&slot| self.heap[slot].count)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Sum of all tracked counts.
    pub fn total_count(&self) -> i64 {
        self.heap.iter().map(|e| e.count).sum()
    }

    /// All entries in rank order (least loaded first).
    pub fn entries(&self) -> Vec<WorkerLoad> {
        let mut entries = self.heap.clone();
        entries.sort();
        entries
    }

    /// Check that the index and the heap describe the same workers and that
    /// the heap property holds.
    pub fn is_consistent(&self) -> bool {
        if self.index.len() != self.heap.len() {
            return false;
        }
        let indexed = self
            .heap
            .iter()
            .enumerate()
            .all(|(slot, entry)| self.index.get(&entry.worker_id) == Some(&slot));
        let ordered = (1..self.heap.len()).all(|i| self.heap[(i - 1) / 2] <= self.heap[i]);
        indexed && ordered
    }

    fn remove_at(&mut self, slot: usize) -> Option<WorkerLoad> {
        let last = self.heap.len().checked_sub(1)?;
        self.swap(slot, last);
        let removed = self.heap.pop()?;
        self.index.remove(&removed.worker_id);
        if slot < self.heap.len() {
            self.restore(slot);
        }
        Some(removed)
    }

    /// Move the entry at `slot` to wherever its current key belongs.
    fn restore(&mut self, slot: usize) {
        if self.sift_up(slot) == slot {
            self.sift_down(slot);
        }
    }

    fn sift_up(&mut self, mut slot: usize) -> usize {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.heap[slot] >= self.heap[parent] {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
        slot
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut smallest = slot;
            if left < len && self.heap[left] < self.heap[smallest] {
                smallest = left;
            }
            if right < len && self.heap[right] < self.heap[smallest] {
                smallest = right;
            }
            if smallest == slot {
                return;
            }
            self.swap(slot, smallest);
            slot = smallest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        if let Some(pos) = self.index.get_mut(&self.heap[a].worker_id) {
            *pos = a;
        }
        if let Some(pos) = self.index.get_mut(&self.heap[b].worker_id) {
            *pos = b;
        }
    }
}
