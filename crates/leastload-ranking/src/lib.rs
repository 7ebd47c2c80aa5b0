//! leastload-ranking — workers ranked by in-flight request count.
//!
//! A binary min-heap over `(count, worker_id)` plus a position index from
//! worker id to heap slot. The index makes arbitrary-key removal and
//! in-place count updates O(log n), which stale-entry purging relies on.
//!
//! # Architecture
//!
//! ```text
//! SharedLoadRanking (Mutex — one exclusion scope per operation or per
//!   │                lock() guard for compound sequences)
//!   └── LoadRanking
//!       ├── heap:  Vec<WorkerLoad>           ordered by (count, worker_id)
//!       └── index: HashMap<worker_id, slot>  always the same key set as heap
//! ```

pub mod ranking;
pub mod shared;

pub use ranking::{LoadRanking, WorkerLoad};
pub use shared::SharedLoadRanking;
