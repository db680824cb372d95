//! Room TTL Sweep Task
//!
//! Background task that periodically sweeps the room keyspace.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::ttl::RoomTtlRefresher;

/// Spawns a background task that runs one sweep per interval.
///
/// The first sweep starts immediately. Each sweep runs to completion before
/// the next tick is awaited, so sweeps never overlap; a slow sweep delays the
/// following tick instead of queueing a burst. Sweeps never fail the task.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let refresher = Arc::new(RoomTtlRefresher::new(store, &config));
/// let sweep_handle = spawn_sweep_task(refresher, Duration::from_secs(60));
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(refresher: Arc<RoomTtlRefresher>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = every.as_secs(),
            "Starting room TTL sweep task"
        );

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            refresher.sweep().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::{MemoryStore, Ttl};

    fn refresher(store: &Arc<MemoryStore>) -> Arc<RoomTtlRefresher> {
        Arc::new(RoomTtlRefresher::new(store.clone(), &Config::default()))
    }

    #[tokio::test]
    async fn test_sweep_task_refreshes_rooms() {
        let store = Arc::new(MemoryStore::new());
        store.set("Room:1", "{}", None).await;

        let handle = spawn_sweep_task(refresher(&store), Duration::from_millis(50));

        // First tick fires immediately
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.ttl("Room:1").await, Some(Ttl::Expires(10_800)));

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_runs_every_tick() {
        let store = Arc::new(MemoryStore::new());
        store.set("Room:1", "{}", None).await;

        let handle = spawn_sweep_task(refresher(&store), Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(110)).await;
        handle.abort();

        assert!(store.stats().await.scans >= 3, "expected several sweeps");
    }

    #[tokio::test]
    async fn test_sweep_task_survives_failed_sweeps() {
        let store = Arc::new(MemoryStore::new());
        store.set("Room:1", "{}", None).await;
        store.fail_scans_after(0).await;

        let handle = spawn_sweep_task(refresher(&store), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished(), "Task should outlive failed sweeps");

        store.clear_faults().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.ttl("Room:1").await, Some(Ttl::Expires(10_800)));

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let store = Arc::new(MemoryStore::new());
        let handle = spawn_sweep_task(refresher(&store), Duration::from_secs(60));

        // Abort immediately
        handle.abort();

        // Wait a bit and verify task is finished
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
