//! Key-Expiry Batcher
//!
//! Pages through `Room:*` with SCAN and extends each page's room base keys in
//! one pipelined round trip.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::TtlConfig;
use crate::error::{KeyParseError, Result};
use crate::keys::{
    current_quiz_key, leaderboard_key, parse_room_id, players_key, room_key, ROOM_KEY_PATTERN,
};
use crate::store::{KeyValueStore, Pipeline, PipelineSummary, ScanPage};
use crate::ttl::PageReport;

/// Room identifiers extracted from a scanned page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage<'a> {
    pub room_ids: Vec<&'a str>,
    pub skipped: usize,
}

/// Scans room keys and applies base-key expirations in bulk.
#[derive(Clone)]
pub struct KeyExpiryBatcher {
    store: Arc<dyn KeyValueStore>,
    ttl: TtlConfig,
    batch_size: usize,
}

impl KeyExpiryBatcher {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: TtlConfig, batch_size: usize) -> Self {
        Self {
            store,
            ttl,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// One SCAN call over `Room:*`. Feed the returned cursor back in until it
    /// comes back as [`SCAN_START`](crate::store::SCAN_START).
    ///
    /// # Arguments
    /// * `cursor` - Where to resume; `SCAN_START` for the first page
    ///
    /// # Returns
    /// The next cursor and up to about `batch_size` matching keys. The page may
    /// be empty while the cursor is not yet back to `SCAN_START`.
    pub async fn scan_page(&self, cursor: u64) -> Result<ScanPage> {
        self.store
            .scan(cursor, ROOM_KEY_PATTERN, self.batch_size)
            .await
    }

    /// Splits a page into room identifiers and keys that are not room records.
    pub fn parse_page<'a>(&self, keys: &'a [String]) -> ParsedPage<'a> {
        let mut parsed = ParsedPage::default();
        for key in keys {
            match parse_room_id(key) {
                Ok(room_id) => parsed.room_ids.push(room_id),
                Err(KeyParseError::DerivedKey) => {
                    debug!(key = %key, "Skipping derived room key");
                    parsed.skipped += 1;
                }
                Err(reason) => {
                    warn!(key = %key, reason = %reason, "Skipping malformed room key");
                    parsed.skipped += 1;
                }
            }
        }
        parsed
    }

    /// Extends the base keys of every room record in `keys` with one pipeline.
    ///
    /// Keys that do not parse are skipped. A page with no rooms submits nothing.
    ///
    /// # Arguments
    /// * `keys` - Keys returned by [`scan_page`](Self::scan_page)
    ///
    /// # Returns
    /// A [`PageReport`] of rooms extended, keys skipped and per-command
    /// outcomes. `Err` only when the pipeline round trip itself failed.
    pub async fn expire_page(&self, keys: &[String]) -> Result<PageReport> {
        let parsed = self.parse_page(keys);
        let summary = self.expire_rooms(&parsed.room_ids).await?;

        Ok(PageReport {
            rooms: parsed.room_ids.len(),
            skipped: parsed.skipped,
            excluded: 0,
            summary,
        })
    }

    /// Extends record, player set, leaderboard and current-quiz pointer for
    /// each room in a single round trip.
    pub async fn expire_rooms(&self, room_ids: &[&str]) -> Result<PipelineSummary> {
        let mut pipeline = Pipeline::new();
        for room_id in room_ids {
            self.queue_base_keys(&mut pipeline, room_id);
        }

        let outcomes = pipeline.flush(self.store.as_ref()).await?;
        let summary = PipelineSummary::from_outcomes(&outcomes);
        if summary.failed > 0 {
            debug!(
                rooms = room_ids.len(),
                failed = summary.failed,
                "Some base-key expirations were rejected"
            );
        }
        Ok(summary)
    }

    fn queue_base_keys(&self, pipeline: &mut Pipeline, room_id: &str) {
        pipeline
            .expire(room_key(room_id), self.ttl.room_ttl())
            .expire(players_key(room_id), self.ttl.room_ttl())
            .expire(leaderboard_key(room_id), self.ttl.leaderboard_ttl())
            .expire(current_quiz_key(room_id), self.ttl.room_ttl());
    }
}
