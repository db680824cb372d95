//! Room TTL - keeps room-scoped game state alive in a shared key-value store
//!
//! Periodically sweeps `Room:*` records and extends their expirations in
//! pipelined batches, and refreshes a single room's full key tree on demand.

pub mod config;
pub mod error;
pub mod keys;
pub mod store;
pub mod tasks;
pub mod ttl;

pub use config::{Config, SweepPolicy, TtlConfig};
pub use error::{KeyParseError, StoreError};
pub use store::{KeyValueStore, MemoryStore};
pub use tasks::spawn_sweep_task;
pub use ttl::{KeyExpiryBatcher, RefreshReport, RoomTtlRefresher, SweepReport};
