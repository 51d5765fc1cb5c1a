//! In-memory implementation of the store trait
//!
//! Backs the test suites and local development runs. The mutex makes every
//! operation atomic, which is exactly the guarantee the Redis commands give.
//! Expiry is lazy: entries are dropped when touched past their deadline, and
//! scans skip them.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::KvStore;
use crate::error::AdapterResult;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

/// Mutex-guarded map with the same capability set as the Redis client
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value without a TTL
    pub fn put(&self, key: &str, value: &str) {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
    }

    /// Insert a value that expires after `ttl`
    pub fn put_with_ttl(&self, key: &str, value: &str, ttl: Duration) {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
    }

    /// Whether a live entry exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map_or(false, Entry::live)
    }

    /// Keys of all live entries
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, entry)| entry.live())
            .map(|(key, _)| key.clone())
            .collect()
    }
}

/// Glob match supporting only the `*` wildcard, like Redis MATCH
fn key_matches(pattern: &str, key: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == key;
    }
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");
    if !key.starts_with(first) {
        return false;
    }
    let mut pos = first.len();
    let mut parts = parts.peekable();
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            return part.is_empty() || key[pos..].ends_with(part);
        }
        match key[pos..].find(part) {
            Some(found) => pos += found + part.len(),
            None => return false,
        }
    }
    true
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> AdapterResult<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.live() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn get_del(&self, key: &str) -> AdapterResult<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.remove(key) {
            Some(entry) if entry.live() => Ok(Some(entry.value)),
            _ => Ok(None),
        }
    }

    async fn scan(
        &self,
        pattern: &str,
        _cursor: u64,
        _count: usize,
    ) -> AdapterResult<(u64, Vec<String>)> {
        let entries = self.entries.lock().unwrap();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| entry.live() && key_matches(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok((0, keys))
    }

    async fn incr(&self, key: &str) -> AdapterResult<i64> {
        let mut entries = self.entries.lock().unwrap();
        let current = match entries.get(key) {
            Some(entry) if entry.live() => entry.value.parse::<i64>().unwrap_or(0),
            _ => 0,
        };
        let next = current + 1;
        let expires_at = entries.get(key).filter(|e| e.live()).and_then(|e| e.expires_at);
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn expire(&self, key: &str, seconds: u64) -> AdapterResult<()> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + Duration::from_secs(seconds));
        }
        Ok(())
    }

    async fn ping(&self) -> AdapterResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_del_consumes_the_entry() {
        let store = MemoryStore::new();
        store.put("auth:tok", "{}");
        assert_eq!(store.get_del("auth:tok").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(store.get_del("auth:tok").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_are_invisible() {
        let store = MemoryStore::new();
        store.put_with_ttl("k", "v", Duration::from_millis(10));
        assert!(store.contains("k"));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.contains("k"));
    }

    #[tokio::test]
    async fn incr_counts_from_one_and_keeps_ttl() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("ratelimit:ip").await.unwrap(), 1);
        store.expire("ratelimit:ip", 60).await.unwrap();
        assert_eq!(store.incr("ratelimit:ip").await.unwrap(), 2);
        assert!(store.contains("ratelimit:ip"));
    }

    #[tokio::test]
    async fn scan_filters_by_pattern() {
        let store = MemoryStore::new();
        store.put("users.u001", "{}");
        store.put("users.u002", "{}");
        store.put("auth:tok", "{}");
        let (cursor, keys) = store.scan("users.*", 0, 100).await.unwrap();
        assert_eq!(cursor, 0);
        assert_eq!(keys, vec!["users.u001".to_string(), "users.u002".to_string()]);
    }

    #[test]
    fn pattern_matching() {
        assert!(key_matches("users.*", "users.u001"));
        assert!(key_matches("*", "anything"));
        assert!(key_matches("auth:*", "auth:abc"));
        assert!(!key_matches("users.*", "auth:abc"));
        assert!(!key_matches("users.u001", "users.u0011"));
    }
}
