//! Memory Store Module
//!
//! In-process keyspace with typed values, TTL expiration, cursor-based SCAN and
//! pipelined EXPIRE. Backs the test suites and local runs; faults can be
//! injected per key or per call to exercise failure isolation.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::store::{
    glob_match, Command, CommandOutcome, Entry, KeyValueStore, Pipeline, ScanPage, StoreStats,
    Ttl, Value, SCAN_START,
};

// == Faults ==
/// Injected failures, checked on every matching call until cleared.
#[derive(Debug, Default)]
struct Faults {
    /// SMEMBERS / SCARD on these keys fail with a transport error
    members_of: HashSet<String>,
    /// SCAN fails once this many scans have been served
    scans_after: Option<u64>,
    /// Whole pipelines touching any of these keys fail with a transport error
    pipelines_touching: HashSet<String>,
    /// Individual commands on these keys fail inside an otherwise healthy pipeline
    commands_on: HashSet<String>,
}

// == Keyspace ==
#[derive(Debug, Default)]
struct Keyspace {
    entries: HashMap<String, Entry>,
    stats: StoreStats,
    faults: Faults,
}

impl Keyspace {
    /// Returns the live entry for `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str) -> Option<&mut Entry> {
        if self.entries.get(key).is_some_and(Entry::is_expired) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn set_members(&mut self, key: &str) -> Result<Option<&BTreeSet<String>>> {
        match self.live(key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => Ok(Some(&*members)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    fn check_member_fault(&mut self, key: &str) -> Result<()> {
        self.stats.record_member_read();
        if self.faults.members_of.contains(key) {
            return Err(StoreError::Transport(format!(
                "injected failure reading members of {}",
                key
            )));
        }
        Ok(())
    }

    fn expire(&mut self, key: &str, seconds: u64) -> CommandOutcome {
        if self.faults.commands_on.contains(key) {
            return CommandOutcome::Failed(format!("injected failure on {}", key));
        }
        match self.live(key) {
            Some(entry) => {
                entry.expire_in(Duration::from_secs(seconds));
                CommandOutcome::Applied
            }
            None => CommandOutcome::Missing,
        }
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Protocol(format!(
        "WRONGTYPE operation against key {} holding the wrong kind of value",
        key
    ))
}

// == Memory Store ==
/// Shared in-process key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Keyspace>,
}

impl MemoryStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Writes ==
    /// Stores a string value, replacing whatever the key held.
    pub async fn set(&self, key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) {
        let value = Value::Str(value.into());
        let entry = match ttl {
            Some(ttl) => Entry::expiring(value, ttl),
            None => Entry::persistent(value),
        };
        self.inner.write().await.entries.insert(key.into(), entry);
    }

    /// Sets a hash field, creating the hash if needed. Keeps any existing expiry.
    pub async fn hset(
        &self,
        key: &str,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let mut keyspace = self.inner.write().await;
        match keyspace.live(key) {
            Some(Entry {
                value: Value::Hash(fields),
                ..
            }) => {
                fields.insert(field.into(), value.into());
            }
            Some(_) => return Err(wrong_type(key)),
            None => {
                let fields = HashMap::from([(field.into(), value.into())]);
                keyspace
                    .entries
                    .insert(key.to_string(), Entry::persistent(Value::Hash(fields)));
            }
        }
        Ok(())
    }

    /// Adds members to a set, creating the set if needed. Keeps any existing expiry.
    pub async fn sadd(&self, key: &str, members: &[&str]) -> Result<()> {
        let mut keyspace = self.inner.write().await;
        match keyspace.live(key) {
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => {
                set.extend(members.iter().map(|m| m.to_string()));
            }
            Some(_) => return Err(wrong_type(key)),
            None => {
                let set = members.iter().map(|m| m.to_string()).collect();
                keyspace
                    .entries
                    .insert(key.to_string(), Entry::persistent(Value::Set(set)));
            }
        }
        Ok(())
    }

    // == Reads ==
    /// Remaining lifetime of `key`, or None when the key does not exist.
    pub async fn ttl(&self, key: &str) -> Option<Ttl> {
        let mut keyspace = self.inner.write().await;
        keyspace.live(key).map(|entry| entry.ttl())
    }

    pub async fn exists(&self, key: &str) -> bool {
        let mut keyspace = self.inner.write().await;
        keyspace.live(key).is_some()
    }

    /// Number of keys held, including expired keys not yet reclaimed.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    pub async fn stats(&self) -> StoreStats {
        let keyspace = self.inner.read().await;
        let mut stats = keyspace.stats.clone();
        stats.set_total_keys(keyspace.entries.len());
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        let mut keyspace = self.inner.write().await;
        let before = keyspace.entries.len();
        keyspace.entries.retain(|_, entry| !entry.is_expired());
        before - keyspace.entries.len()
    }

    // == Fault Injection ==
    pub async fn fail_members_of(&self, key: &str) {
        self.inner
            .write()
            .await
            .faults
            .members_of
            .insert(key.to_string());
    }

    /// Lets `served` more scans succeed, then fails every later scan.
    pub async fn fail_scans_after(&self, served: u64) {
        let mut keyspace = self.inner.write().await;
        keyspace.faults.scans_after = Some(keyspace.stats.scans + served);
    }

    pub async fn fail_pipelines_touching(&self, key: &str) {
        self.inner
            .write()
            .await
            .faults
            .pipelines_touching
            .insert(key.to_string());
    }

    pub async fn fail_command_on(&self, key: &str) {
        self.inner
            .write()
            .await
            .faults
            .commands_on
            .insert(key.to_string());
    }

    pub async fn clear_faults(&self) {
        self.inner.write().await.faults = Faults::default();
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        let count = count.max(1);
        let mut keyspace = self.inner.write().await;

        if let Some(limit) = keyspace.faults.scans_after {
            if keyspace.stats.scans >= limit {
                return Err(StoreError::Transport(format!(
                    "injected failure scanning at cursor {}",
                    cursor
                )));
            }
        }
        keyspace.stats.record_scan();
        keyspace.entries.retain(|_, entry| !entry.is_expired());

        // Sorted for deterministic paging over a static keyspace
        let mut keys: Vec<&String> = keyspace
            .entries
            .keys()
            .filter(|key| glob_match(pattern, key))
            .collect();
        keys.sort();

        // Take count+1 to know whether another page follows
        let mut page: Vec<String> = keys
            .into_iter()
            .skip(cursor as usize)
            .take(count + 1)
            .cloned()
            .collect();

        let next_cursor = if page.len() > count {
            page.truncate(count);
            cursor + count as u64
        } else {
            SCAN_START
        };

        debug!(cursor, next_cursor, matched = page.len(), "Served scan page");
        Ok(ScanPage {
            cursor: next_cursor,
            keys: page,
        })
    }

    async fn members(&self, key: &str) -> Result<Vec<String>> {
        let mut keyspace = self.inner.write().await;
        keyspace.check_member_fault(key)?;
        Ok(keyspace
            .set_members(key)?
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn cardinality(&self, key: &str) -> Result<usize> {
        let mut keyspace = self.inner.write().await;
        keyspace.check_member_fault(key)?;
        Ok(keyspace.set_members(key)?.map_or(0, BTreeSet::len))
    }

    async fn execute(&self, pipeline: &Pipeline) -> Result<Vec<CommandOutcome>> {
        let mut keyspace = self.inner.write().await;

        if let Some(key) = pipeline
            .keys()
            .find(|key| keyspace.faults.pipelines_touching.contains(*key))
        {
            return Err(StoreError::Transport(format!(
                "injected failure executing pipeline touching {}",
                key
            )));
        }

        let outcomes: Vec<CommandOutcome> = pipeline
            .commands()
            .iter()
            .map(|command| match command {
                Command::Expire { key, seconds } => keyspace.expire(key, *seconds),
            })
            .collect();

        keyspace.stats.record_pipeline(&outcomes);
        Ok(outcomes)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_store_new() {
        let store = MemoryStore::new();
        assert_eq!(store.len().await, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_and_ttl() {
        let store = MemoryStore::new();
        store.set("Room:1", "{}", None).await;
        store
            .set("Player:p1", "{}", Some(Duration::from_secs(30)))
            .await;

        assert_eq!(store.ttl("Room:1").await, Some(Ttl::Persistent));
        assert_eq!(store.ttl("Player:p1").await, Some(Ttl::Expires(30)));
        assert_eq!(store.ttl("Player:p2").await, None);
    }

    #[tokio::test]
    async fn test_expire_existing_and_missing() {
        let store = MemoryStore::new();
        store.set("Room:1", "{}", None).await;

        let mut pipeline = Pipeline::new();
        pipeline
            .expire("Room:1", Duration::from_secs(120))
            .expire("Room:2", Duration::from_secs(120));

        let outcomes = assert_ok!(store.execute(&pipeline).await);
        assert_eq!(
            outcomes,
            vec![CommandOutcome::Applied, CommandOutcome::Missing]
        );
        assert_eq!(store.ttl("Room:1").await, Some(Ttl::Expires(120)));
        // Expiring an absent key never creates it
        assert!(!store.exists("Room:2").await);
    }

    #[tokio::test]
    async fn test_expired_keys_are_invisible() {
        let store = MemoryStore::new();
        store
            .set("Room:1", "{}", Some(Duration::from_millis(20)))
            .await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(!store.exists("Room:1").await);
        let page = assert_ok!(store.scan(SCAN_START, "Room:*", 10).await);
        assert!(page.keys.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let store = MemoryStore::new();
        store
            .set("a", "1", Some(Duration::from_millis(20)))
            .await;
        store.set("b", "2", Some(Duration::from_secs(10))).await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.cleanup_expired().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_scan_pages_in_order() {
        let store = MemoryStore::new();
        for id in ["a", "b", "c", "d", "e"] {
            store.set(format!("Room:{}", id), "{}", None).await;
        }
        store.set("Player:p1", "{}", None).await;

        let first = assert_ok!(store.scan(SCAN_START, "Room:*", 2).await);
        assert_eq!(first.keys, vec!["Room:a", "Room:b"]);
        assert_eq!(first.cursor, 2);

        let second = assert_ok!(store.scan(first.cursor, "Room:*", 2).await);
        assert_eq!(second.keys, vec!["Room:c", "Room:d"]);

        let last = assert_ok!(store.scan(second.cursor, "Room:*", 2).await);
        assert_eq!(last.keys, vec!["Room:e"]);
        assert!(last.is_last());
        assert_eq!(store.stats().await.scans, 3);
    }

    #[tokio::test]
    async fn test_scan_empty_keyspace() {
        let store = MemoryStore::new();
        let page = assert_ok!(store.scan(SCAN_START, "Room:*", 100).await);
        assert!(page.is_last());
        assert!(page.keys.is_empty());
    }

    #[tokio::test]
    async fn test_sets() {
        let store = MemoryStore::new();
        assert_ok!(store.sadd("Room:1:Players", &["p2", "p1"]).await);
        assert_ok!(store.sadd("Room:1:Players", &["p1", "p3"]).await);

        let members = assert_ok!(store.members("Room:1:Players").await);
        assert_eq!(members, vec!["p1", "p2", "p3"]);
        assert_eq!(assert_ok!(store.cardinality("Room:1:Players").await), 3);
        assert!(assert_ok!(store.members("Room:9:Players").await).is_empty());
        assert_eq!(assert_ok!(store.cardinality("Room:9:Players").await), 0);
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let store = MemoryStore::new();
        store.set("Room:1", "{}", None).await;

        assert_err!(store.members("Room:1").await);
        assert_err!(store.sadd("Room:1", &["x"]).await);
    }

    #[tokio::test]
    async fn test_hset_keeps_expiry() {
        let store = MemoryStore::new();
        assert_ok!(store.hset("Room:1", "name", "trivia").await);

        let mut pipeline = Pipeline::new();
        pipeline.expire("Room:1", Duration::from_secs(60));
        assert_ok!(store.execute(&pipeline).await);

        assert_ok!(store.hset("Room:1", "state", "lobby").await);
        assert_eq!(store.ttl("Room:1").await, Some(Ttl::Expires(60)));
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let store = MemoryStore::new();
        store.set("Room:1", "{}", None).await;
        store.set("Room:2", "{}", None).await;

        store.fail_members_of("Room:1:Players").await;
        assert_err!(store.members("Room:1:Players").await);

        store.fail_command_on("Room:2").await;
        let mut pipeline = Pipeline::new();
        pipeline
            .expire("Room:1", Duration::from_secs(60))
            .expire("Room:2", Duration::from_secs(60));
        let outcomes = assert_ok!(store.execute(&pipeline).await);
        assert_eq!(outcomes[0], CommandOutcome::Applied);
        assert!(matches!(outcomes[1], CommandOutcome::Failed(_)));

        store.fail_pipelines_touching("Room:1").await;
        assert_err!(store.execute(&pipeline).await);

        store.fail_scans_after(0).await;
        assert_err!(store.scan(SCAN_START, "Room:*", 10).await);

        store.clear_faults().await;
        assert_ok!(store.members("Room:1:Players").await);
        assert_ok!(store.execute(&pipeline).await);
    }
}
