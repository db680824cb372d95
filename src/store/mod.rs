//! Store Module
//!
//! The slice of the key-value store protocol the refresher relies on, plus an
//! in-process implementation and (behind `redis-store`) a Redis client.

mod entry;
mod glob;
mod memory;
mod pipeline;
#[cfg(feature = "redis-store")]
mod redis_store;
mod stats;


use async_trait::async_trait;

use crate::error::Result;

// Re-export public types
pub use entry::{Entry, Ttl, Value};
pub use glob::glob_match;
pub use memory::MemoryStore;
pub use pipeline::{Command, CommandOutcome, Pipeline, PipelineSummary};
#[cfg(feature = "redis-store")]
pub use redis_store::RedisStore;
pub use stats::StoreStats;

/// Cursor value that starts a keyspace scan and signals its completion.
pub const SCAN_START: u64 = 0;

// == Scan Page ==
/// One page of an incremental keyspace scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor to pass to the next call; [`SCAN_START`] once the scan is done
    pub cursor: u64,
    /// Keys matched on this call (may be empty even mid-scan)
    pub keys: Vec<String>,
}

impl ScanPage {
    pub fn is_last(&self) -> bool {
        self.cursor == SCAN_START
    }
}

// == Key-Value Store ==
/// Store operations used by the TTL refresher.
///
/// Every method is one round trip. Implementations are shared between the
/// sweep task and concurrent on-demand refreshes.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Incremental keyspace scan. `count` is a hint; pages may be larger or smaller.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage>;

    /// All members of a set; an absent key reads as empty.
    async fn members(&self, key: &str) -> Result<Vec<String>>;

    /// Number of members of a set; an absent key reads as zero.
    async fn cardinality(&self, key: &str) -> Result<usize>;

    /// Runs every queued command, returning one outcome per command in queue order.
    async fn execute(&self, pipeline: &Pipeline) -> Result<Vec<CommandOutcome>>;
}
