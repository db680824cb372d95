//! TTL Refresh Module
//!
//! Keeps room-scoped game state alive in the shared store.
//!
//! # Components
//! - [`KeyExpiryBatcher`]: SCAN paging over `Room:*` and pipelined base-key EXPIREs
//! - [`RoomTtlRefresher`]: periodic sweep driver and per-room on-demand refresh
//! - [`FailureSink`]: destination for failures caught at sweep and sub-task boundaries

mod batcher;
mod orchestrator;
mod report;
mod sink;

pub use batcher::{KeyExpiryBatcher, ParsedPage};
pub use orchestrator::RoomTtlRefresher;
pub use report::{
    PageReport, RefreshReport, Subtask, SubtaskOutcome, SweepOutcome, SweepReport,
};
pub use sink::{CollectingSink, FailureSink, RefreshFailure, TracingSink};
