//! Reports returned by sweeps and on-demand refreshes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::PipelineSummary;

// == Page Report ==
/// What one scanned page contributed to a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageReport {
    /// Rooms whose base keys were queued
    pub rooms: usize,
    /// Keys that did not parse as a room record
    pub skipped: usize,
    /// Rooms left out by the sweep policy
    pub excluded: usize,
    pub summary: PipelineSummary,
}

// == Sweep Report ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepOutcome {
    /// Cursor returned to the start sentinel
    Completed,
    /// A round trip failed; remaining pages wait for the next tick
    Aborted,
}

/// Summary of one sweep over the `Room:*` keyspace.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// SCAN round trips issued
    pub scans: usize,
    /// Non-empty pages handed to the batcher
    pub pages: usize,
    pub rooms_refreshed: usize,
    pub keys_skipped: usize,
    pub rooms_excluded: usize,
    /// Cursor of the last SCAN issued
    pub cursor: u64,
    pub summary: PipelineSummary,
    pub outcome: SweepOutcome,
}

impl SweepReport {
    pub(crate) fn begin() -> Self {
        Self {
            started_at: Utc::now(),
            elapsed_ms: 0,
            scans: 0,
            pages: 0,
            rooms_refreshed: 0,
            keys_skipped: 0,
            rooms_excluded: 0,
            cursor: 0,
            summary: PipelineSummary::default(),
            outcome: SweepOutcome::Completed,
        }
    }

    pub(crate) fn absorb(&mut self, page: PageReport) {
        self.pages += 1;
        self.rooms_refreshed += page.rooms;
        self.keys_skipped += page.skipped;
        self.rooms_excluded += page.excluded;
        self.summary.merge(page.summary);
    }

    pub fn is_complete(&self) -> bool {
        self.outcome == SweepOutcome::Completed
    }
}

// == Refresh Report ==
/// The three independent parts of an on-demand room refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subtask {
    BaseKeys,
    PlayerKeys,
    QuizKeys,
}

impl fmt::Display for Subtask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Subtask::BaseKeys => "base_keys",
            Subtask::PlayerKeys => "player_keys",
            Subtask::QuizKeys => "quiz_keys",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SubtaskOutcome {
    Done { summary: PipelineSummary },
    Failed { error: String },
}

impl SubtaskOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, SubtaskOutcome::Done { .. })
    }

    pub fn summary(&self) -> Option<PipelineSummary> {
        match self {
            SubtaskOutcome::Done { summary } => Some(*summary),
            SubtaskOutcome::Failed { .. } => None,
        }
    }
}

/// Settled outcome of each sub-task of `refresh_room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub room_id: String,
    pub base: SubtaskOutcome,
    pub players: SubtaskOutcome,
    pub quizzes: SubtaskOutcome,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.base.is_done() && self.players.is_done() && self.quizzes.is_done()
    }

    pub fn failed_subtasks(&self) -> Vec<Subtask> {
        [
            (Subtask::BaseKeys, &self.base),
            (Subtask::PlayerKeys, &self.players),
            (Subtask::QuizKeys, &self.quizzes),
        ]
        .into_iter()
        .filter(|(_, outcome)| !outcome.is_done())
        .map(|(subtask, _)| subtask)
        .collect()
    }
}
