//! Room TTL Refresh Orchestrator
//!
//! Drives full-keyspace sweeps and on-demand refreshes of a single room's key
//! tree. Both entry points are best-effort: failures are handed to the
//! [`FailureSink`] and never returned to the caller.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, SweepPolicy, TtlConfig};
use crate::error::Result;
use crate::keys::{player_key, players_key, quiz_choices_key, quiz_key, quiz_set_key};
use crate::store::{KeyValueStore, Pipeline, PipelineSummary, SCAN_START};
use crate::ttl::{
    FailureSink, KeyExpiryBatcher, PageReport, RefreshFailure, RefreshReport, Subtask,
    SubtaskOutcome, SweepOutcome, SweepReport, TracingSink,
};

/// Keeps live rooms from expiring out of the shared store.
#[derive(Clone)]
pub struct RoomTtlRefresher {
    store: Arc<dyn KeyValueStore>,
    batcher: KeyExpiryBatcher,
    ttl: TtlConfig,
    policy: SweepPolicy,
    sink: Arc<dyn FailureSink>,
}

impl RoomTtlRefresher {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &Config) -> Self {
        Self {
            batcher: KeyExpiryBatcher::new(store.clone(), config.ttl, config.scan_batch_size),
            store,
            ttl: config.ttl,
            policy: config.sweep_policy,
            sink: Arc::new(TracingSink),
        }
    }

    /// Replaces the default tracing sink.
    pub fn with_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.sink = sink;
        self
    }

    // == Sweep ==
    /// Walks the whole `Room:*` keyspace once, extending each room's base keys.
    ///
    /// A failed round trip ends this sweep; the next one starts over from the
    /// first page.
    ///
    /// # Returns
    /// A [`SweepReport`] with page and room counts and the merged per-command
    /// outcomes. Its `outcome` is `Aborted` when a round trip failed; the
    /// failure itself goes to the sink.
    #[instrument(skip(self), fields(policy = ?self.policy))]
    pub async fn sweep(&self) -> SweepReport {
        let started = Instant::now();
        let mut report = SweepReport::begin();

        if let Err(e) = self.run_sweep(&mut report).await {
            report.outcome = SweepOutcome::Aborted;
            self.sink.record(&RefreshFailure::Sweep {
                cursor: report.cursor,
                pages_completed: report.pages,
                transient: e.is_transient(),
                error: e.to_string(),
            });
        }
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            scans = report.scans,
            pages = report.pages,
            rooms = report.rooms_refreshed,
            skipped = report.keys_skipped,
            excluded = report.rooms_excluded,
            elapsed_ms = report.elapsed_ms,
            outcome = ?report.outcome,
            "Room TTL sweep finished"
        );
        if let Ok(json) = serde_json::to_string(&report) {
            debug!(report = %json, "Sweep report");
        }
        report
    }

    async fn run_sweep(&self, report: &mut SweepReport) -> Result<()> {
        let mut cursor = SCAN_START;
        loop {
            report.cursor = cursor;
            let page = self.batcher.scan_page(cursor).await?;
            report.scans += 1;

            if !page.keys.is_empty() {
                let page_report = self.expire_discovered(&page.keys).await?;
                report.absorb(page_report);
            }

            cursor = page.cursor;
            if cursor == SCAN_START {
                return Ok(());
            }
        }
    }

    async fn expire_discovered(&self, keys: &[String]) -> Result<PageReport> {
        match self.policy {
            SweepPolicy::RefreshAll => self.batcher.expire_page(keys).await,
            SweepPolicy::SkipEmptyRooms => {
                let parsed = self.batcher.parse_page(keys);
                let occupied = self.occupied_rooms(&parsed.room_ids).await;
                let summary = self.batcher.expire_rooms(&occupied).await?;

                Ok(PageReport {
                    rooms: occupied.len(),
                    skipped: parsed.skipped,
                    excluded: parsed.room_ids.len() - occupied.len(),
                    summary,
                })
            }
        }
    }

    /// Rooms with at least one player. A room whose count cannot be read is kept.
    async fn occupied_rooms<'a>(&self, room_ids: &[&'a str]) -> Vec<&'a str> {
        let player_sets: Vec<String> = room_ids.iter().map(|room_id| players_key(room_id)).collect();
        let counts = join_all(player_sets.iter().map(|key| self.store.cardinality(key))).await;

        room_ids
            .iter()
            .zip(counts)
            .filter_map(|(room_id, count)| match count {
                Ok(0) => {
                    debug!(room_id = %room_id, "Leaving empty room to expire");
                    None
                }
                Ok(_) => Some(*room_id),
                Err(e) => {
                    warn!(room_id = %room_id, error = %e, "Player count unavailable, refreshing room");
                    Some(*room_id)
                }
            })
            .collect()
    }

    // == On-Demand Refresh ==
    /// Extends every key belonging to `room_id`: its base keys, its players'
    /// records and its quizzes. The three parts run concurrently and a failure
    /// in one does not stop the others.
    ///
    /// # Arguments
    /// * `room_id` - The id part of `Room:{id}`; the room need not exist
    ///
    /// # Returns
    /// A [`RefreshReport`] with one [`SubtaskOutcome`] per part.
    #[instrument(skip(self))]
    pub async fn refresh_room(&self, room_id: &str) -> RefreshReport {
        let (base, players, quizzes) = tokio::join!(
            self.refresh_base_keys(room_id),
            self.refresh_player_keys(room_id),
            self.refresh_quiz_keys(room_id),
        );

        let report = RefreshReport {
            room_id: room_id.to_string(),
            base: self.settle(room_id, Subtask::BaseKeys, base),
            players: self.settle(room_id, Subtask::PlayerKeys, players),
            quizzes: self.settle(room_id, Subtask::QuizKeys, quizzes),
        };
        debug!(
            room_id = %room_id,
            complete = report.is_complete(),
            "Room TTL refresh finished"
        );
        report
    }

    /// Refreshes several rooms concurrently.
    pub async fn refresh_rooms<S: AsRef<str>>(&self, room_ids: &[S]) -> Vec<RefreshReport> {
        join_all(
            room_ids
                .iter()
                .map(|room_id| self.refresh_room(room_id.as_ref())),
        )
        .await
    }

    fn settle(
        &self,
        room_id: &str,
        subtask: Subtask,
        result: Result<PipelineSummary>,
    ) -> SubtaskOutcome {
        match result {
            Ok(summary) => SubtaskOutcome::Done { summary },
            Err(e) => {
                self.sink.record(&RefreshFailure::Subtask {
                    room_id: room_id.to_string(),
                    subtask,
                    transient: e.is_transient(),
                    error: e.to_string(),
                });
                SubtaskOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn refresh_base_keys(&self, room_id: &str) -> Result<PipelineSummary> {
        self.batcher.expire_rooms(&[room_id]).await
    }

    async fn refresh_player_keys(&self, room_id: &str) -> Result<PipelineSummary> {
        let players = self.store.members(&players_key(room_id)).await?;

        let mut pipeline = Pipeline::new();
        for player_id in &players {
            pipeline.expire(player_key(player_id), self.ttl.player_ttl());
        }
        let outcomes = pipeline.flush(self.store.as_ref()).await?;
        Ok(PipelineSummary::from_outcomes(&outcomes))
    }

    async fn refresh_quiz_keys(&self, room_id: &str) -> Result<PipelineSummary> {
        let quizzes = self.store.members(&quiz_set_key(room_id)).await?;

        let mut pipeline = Pipeline::new();
        for quiz_id in &quizzes {
            pipeline
                .expire(quiz_key(room_id, quiz_id), self.ttl.quiz_ttl())
                .expire(quiz_choices_key(room_id, quiz_id), self.ttl.quiz_ttl());
        }
        let outcomes = pipeline.flush(self.store.as_ref()).await?;
        Ok(PipelineSummary::from_outcomes(&outcomes))
    }
}
