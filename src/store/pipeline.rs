//! Pipeline Module
//!
//! Accumulates commands for submission to the store in a single round trip.

use std::time::Duration;

use serde::Serialize;

use crate::error::Result;
use crate::store::KeyValueStore;

// == Command ==
/// A queued store command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// EXPIRE key seconds
    Expire { key: String, seconds: u64 },
}

impl Command {
    /// The key the command targets.
    pub fn key(&self) -> &str {
        match self {
            Command::Expire { key, .. } => key,
        }
    }
}

// == Command Outcome ==
/// Result of one command inside an executed pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum CommandOutcome {
    /// Expiration was set on an existing key
    Applied,
    /// Key does not exist; nothing changed
    Missing,
    /// The store rejected this command; siblings still ran
    Failed(String),
}

// == Pipeline ==
/// Builder for a batch of commands sent in one round trip.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    commands: Vec<Command>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an EXPIRE. Sub-second durations are rounded up to one second
    /// so a queued expiry never deletes the key outright.
    pub fn expire(&mut self, key: impl Into<String>, ttl: Duration) -> &mut Self {
        self.commands.push(Command::Expire {
            key: key.into(),
            seconds: ttl.as_secs().max(1),
        });
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(Command::key)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Submits the queued commands and returns one outcome per command.
    ///
    /// An empty pipeline completes without touching the store.
    pub async fn flush(&self, store: &dyn KeyValueStore) -> Result<Vec<CommandOutcome>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        store.execute(self).await
    }
}

// == Pipeline Summary ==
/// Tally of command outcomes across one or more pipelines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub applied: usize,
    pub missing: usize,
    pub failed: usize,
}

impl PipelineSummary {
    pub fn from_outcomes(outcomes: &[CommandOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                CommandOutcome::Applied => summary.applied += 1,
                CommandOutcome::Missing => summary.missing += 1,
                CommandOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.applied + self.missing + self.failed
    }

    pub fn merge(&mut self, other: PipelineSummary) {
        self.applied += other.applied;
        self.missing += other.missing;
        self.failed += other.failed;
    }
}
