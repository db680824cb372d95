//! Room TTL - host process
//!
//! Connects to the shared store and keeps room state alive until shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use room_ttl::store::RedisStore;
use room_ttl::{spawn_sweep_task, Config, RoomTtlRefresher};

/// Main entry point for the room TTL refresher.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect to the shared store
/// 4. Start the periodic sweep task
/// 5. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "room_ttl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting room TTL refresher");

    let config = Config::from_env();
    info!(
        sweep_interval_secs = config.sweep_interval,
        scan_batch_size = config.scan_batch_size,
        room_ttl = config.ttl.room,
        player_ttl = config.ttl.player,
        quiz_ttl = config.ttl.quiz,
        leaderboard_ttl = config.ttl.leaderboard,
        sweep_policy = ?config.sweep_policy,
        "Configuration loaded"
    );

    let store = RedisStore::connect(&config.redis_url)
        .await
        .with_context(|| format!("connecting to {}", config.redis_url))?;
    info!("Connected to store");

    let refresher = Arc::new(RoomTtlRefresher::new(Arc::new(store), &config));
    let sweep_handle = spawn_sweep_task(refresher, config.sweep_interval());
    info!("Background sweep task started");

    shutdown_signal().await?;

    sweep_handle.abort();
    warn!("Sweep task aborted");
    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("installing Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("installing SIGTERM handler")?
            .recv()
            .await;
        Ok::<(), anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<anyhow::Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            info!("Received Ctrl+C, initiating shutdown...");
        }
        result = terminate => {
            result?;
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
    Ok(())
}
