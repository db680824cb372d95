//! Store Statistics Module
//!
//! Counts round trips and command outcomes seen by the in-process store.

use serde::Serialize;

use crate::store::CommandOutcome;

// == Store Stats ==
/// Round-trip and command counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// SCAN calls served
    pub scans: u64,
    /// Pipelines executed (one round trip each)
    pub pipelines: u64,
    /// Commands executed across all pipelines
    pub commands: u64,
    /// SMEMBERS / SCARD reads served
    pub member_reads: u64,
    /// EXPIRE commands that hit an existing key
    pub expires_applied: u64,
    /// EXPIRE commands on absent keys
    pub expires_missing: u64,
    /// Commands rejected inside a pipeline
    pub commands_failed: u64,
    /// Current number of live keys
    pub total_keys: usize,
}

impl StoreStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_scan(&mut self) {
        self.scans += 1;
    }

    pub fn record_member_read(&mut self) {
        self.member_reads += 1;
    }

    /// Records one executed pipeline and the outcome of each of its commands.
    pub fn record_pipeline(&mut self, outcomes: &[CommandOutcome]) {
        self.pipelines += 1;
        self.commands += outcomes.len() as u64;
        for outcome in outcomes {
            match outcome {
                CommandOutcome::Applied => self.expires_applied += 1,
                CommandOutcome::Missing => self.expires_missing += 1,
                CommandOutcome::Failed(_) => self.commands_failed += 1,
            }
        }
    }

    pub fn set_total_keys(&mut self, count: usize) {
        self.total_keys = count;
    }
}
