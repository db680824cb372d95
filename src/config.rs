//! Configuration Module
//!
//! Handles loading and managing refresher configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

/// Expiration classes, in seconds, applied to each family of keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TtlConfig {
    /// Room record, player set and current-quiz pointer
    pub room: u64,
    /// `Player:{id}` records
    pub player: u64,
    /// Quiz records and their choices
    pub quiz: u64,
    /// Room leaderboard
    pub leaderboard: u64,
}

impl TtlConfig {
    pub fn room_ttl(&self) -> Duration {
        Duration::from_secs(self.room)
    }

    pub fn player_ttl(&self) -> Duration {
        Duration::from_secs(self.player)
    }

    pub fn quiz_ttl(&self) -> Duration {
        Duration::from_secs(self.quiz)
    }

    pub fn leaderboard_ttl(&self) -> Duration {
        Duration::from_secs(self.leaderboard)
    }
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            room: 10_800,
            player: 7_200,
            quiz: 3_600,
            leaderboard: 10_800,
        }
    }
}

/// Which discovered rooms a sweep extends.
///
/// `refresh_room` ignores this and always refreshes the room it is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SweepPolicy {
    /// Extend every room the scan discovers
    #[default]
    RefreshAll,
    /// Leave rooms whose player set is empty to expire on their own
    SkipEmptyRooms,
}

impl FromStr for SweepPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "refresh-all" | "all" => Ok(SweepPolicy::RefreshAll),
            "skip-empty-rooms" | "skip-empty" => Ok(SweepPolicy::SkipEmptyRooms),
            other => Err(format!("unknown sweep policy '{}'", other)),
        }
    }
}

/// Refresher configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Connection URL of the shared store
    pub redis_url: String,
    /// Seconds between sweep ticks
    pub sweep_interval: u64,
    /// COUNT hint passed to each SCAN call
    pub scan_batch_size: usize,
    /// Expiration classes
    pub ttl: TtlConfig,
    /// Room selection policy for sweeps
    pub sweep_policy: SweepPolicy,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - Store URL (default: redis://127.0.0.1:6379)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `SCAN_BATCH_SIZE` - SCAN COUNT hint (default: 100, minimum 1)
    /// - `ROOM_TTL` / `PLAYER_TTL` / `QUIZ_TTL` / `LEADERBOARD_TTL` - TTL classes in seconds
    /// - `SWEEP_POLICY` - `refresh-all` or `skip-empty-rooms` (default: refresh-all)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            sweep_interval: env_or("SWEEP_INTERVAL", defaults.sweep_interval),
            scan_batch_size: env_or("SCAN_BATCH_SIZE", defaults.scan_batch_size).max(1),
            ttl: TtlConfig {
                room: env_or("ROOM_TTL", defaults.ttl.room),
                player: env_or("PLAYER_TTL", defaults.ttl.player),
                quiz: env_or("QUIZ_TTL", defaults.ttl.quiz),
                leaderboard: env_or("LEADERBOARD_TTL", defaults.ttl.leaderboard),
            },
            sweep_policy: env_or("SWEEP_POLICY", defaults.sweep_policy),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            sweep_interval: 60,
            scan_batch_size: 100,
            ttl: TtlConfig::default(),
            sweep_policy: SweepPolicy::RefreshAll,
        }
    }
}

/// Parses an environment variable, falling back when it is unset or malformed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
