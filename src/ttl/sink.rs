//! Failure Sink Module
//!
//! Where recoverable refresh failures go. The refresher never lets a failure
//! escape to its caller; it hands a record to the sink and moves on.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::{error, warn};

use crate::ttl::Subtask;

/// A recoverable failure caught at a sweep or sub-task boundary.
///
/// `transient` is set for transport and timeout errors, which a later sweep
/// or retry can be expected to get past.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RefreshFailure {
    /// A sweep stopped early; the next tick starts over from the first page
    Sweep {
        cursor: u64,
        pages_completed: usize,
        transient: bool,
        error: String,
    },
    /// One sub-task of an on-demand room refresh failed
    Subtask {
        room_id: String,
        subtask: Subtask,
        transient: bool,
        error: String,
    },
}

pub trait FailureSink: Send + Sync {
    fn record(&self, failure: &RefreshFailure);
}

/// Default sink: structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn record(&self, failure: &RefreshFailure) {
        match failure {
            RefreshFailure::Sweep {
                cursor,
                pages_completed,
                transient,
                error,
            } => {
                error!(
                    cursor = *cursor,
                    pages_completed = *pages_completed,
                    transient = *transient,
                    error = %error,
                    "Room TTL sweep aborted"
                );
            }
            RefreshFailure::Subtask {
                room_id,
                subtask,
                transient,
                error,
            } => {
                warn!(
                    room_id = %room_id,
                    subtask = %subtask,
                    transient = *transient,
                    error = %error,
                    "Room TTL refresh sub-task failed"
                );
            }
        }
    }
}

/// Sink that keeps every failure it is handed, for hosts that report them
/// elsewhere and for tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    failures: Mutex<Vec<RefreshFailure>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<RefreshFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take(&self) -> Vec<RefreshFailure> {
        std::mem::take(&mut *self.failures.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl FailureSink for CollectingSink {
    fn record(&self, failure: &RefreshFailure) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure.clone());
    }
}
