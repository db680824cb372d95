//! Store Entry Module
//!
//! Typed values held by [`MemoryStore`](crate::store::MemoryStore) along with
//! their expiration metadata.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Value ==
/// The value types the room flows persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    Set(BTreeSet<String>),
}

// == Ttl ==
/// Remaining lifetime of a key, as reported by TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Key has no expiration
    Persistent,
    /// Whole seconds left, rounded up
    Expires(u64),
}

// == Entry ==
/// A single key's value and metadata.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl Entry {
    /// Creates an entry with no expiration.
    pub fn persistent(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates an entry that expires `ttl` from now.
    pub fn expiring(value: Value, ttl: Duration) -> Self {
        let mut entry = Self::persistent(value);
        entry.expire_in(ttl);
        entry
    }

    /// Resets the expiration to `ttl` from now, replacing any previous deadline.
    pub fn expire_in(&mut self, ttl: Duration) {
        self.expires_at = Some(current_timestamp_ms() + ttl.as_millis() as u64);
    }

    /// An entry is expired once the current time reaches its deadline.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    /// Remaining lifetime, with partial seconds rounded up.
    pub fn ttl(&self) -> Ttl {
        match self.expires_at {
            Some(expires) => {
                let remaining_ms = expires.saturating_sub(current_timestamp_ms());
                Ttl::Expires(remaining_ms.div_ceil(1000))
            }
            None => Ttl::Persistent,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
