//! Cache Backend Module
//!
//! The external cache collaborator interface and an in-memory implementation
//! with TTL expiration and LRU eviction.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, LruTracker};
use crate::error::CacheBackendError;

/// Result type for backend operations.
pub type BackendResult<T> = std::result::Result<T, CacheBackendError>;

// == Cache Backend ==
/// External key/bytes cache with per-entry TTL.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`; a TTL of zero means no expiry.
    fn put(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> BackendResult<()>;

    /// Removes `key`. Returns whether an entry was present.
    fn forget(&self, key: &str) -> BackendResult<bool>;

    /// Whether `flush_prefix` is available.
    fn supports_bulk_flush(&self) -> bool {
        false
    }

    /// Removes every entry whose key starts with `prefix`.
    fn flush_prefix(&self, _prefix: &str) -> BackendResult<usize> {
        Err(CacheBackendError::Unsupported("flush_prefix"))
    }
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, CacheEntry>,
    lru: LruTracker,
    stats: CacheStats,
}

impl Entries {
    fn remove(&mut self, key: &str) -> bool {
        let removed = self.map.remove(key).is_some();
        self.lru.remove(key);
        self.stats.set_total_entries(self.map.len());
        removed
    }
}

// == Memory Cache Backend ==
/// Process-wide cache backend bounded by `max_entries`.
#[derive(Debug)]
pub struct MemoryCacheBackend {
    entries: Mutex<Entries>,
    max_entries: usize,
}

impl MemoryCacheBackend {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            max_entries: max_entries.max(1),
        }
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        let mut stats = entries.stats.clone();
        stats.set_total_entries(entries.map.len());
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let expired: Vec<String> = entries
            .map
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.remove(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl CacheBackend for MemoryCacheBackend {
    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        let mut guard = self.entries.lock();
        let entries = &mut *guard;

        let expired = match entries.map.get(key) {
            Some(entry) if !entry.is_expired() => {
                let value = entry.value.clone();
                entries.stats.record_hit();
                entries.lru.touch(key);
                return Ok(Some(value));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(key);
        }
        entries.stats.record_miss();
        Ok(None)
    }

    fn put(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> BackendResult<()> {
        let mut entries = self.entries.lock();

        if !entries.map.contains_key(key) && entries.map.len() >= self.max_entries {
            if let Some(evicted) = entries.lru.evict_oldest() {
                entries.map.remove(&evicted);
                entries.stats.record_eviction();
                debug!(key = %evicted, "Evicted least recently used cache entry");
            }
        }

        entries
            .map
            .insert(key.to_string(), CacheEntry::new(value, ttl_seconds));
        entries.lru.touch(key);
        let len = entries.map.len();
        entries.stats.set_total_entries(len);
        Ok(())
    }

    fn forget(&self, key: &str) -> BackendResult<bool> {
        Ok(self.entries.lock().remove(key))
    }

    fn supports_bulk_flush(&self) -> bool {
        true
    }

    fn flush_prefix(&self, prefix: &str) -> BackendResult<usize> {
        let mut entries = self.entries.lock();
        let matching: Vec<String> = entries
            .map
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        for key in &matching {
            entries.remove(key);
        }
        Ok(matching.len())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(s: &str) -> Vec<u8> {
        s.as_bytes().to_vec()
    }

    #[test]
    fn test_put_and_get() {
        let backend = MemoryCacheBackend::new(10);
        backend.put("k", bytes("v"), 60).unwrap();

        assert_eq!(backend.get("k").unwrap(), Some(bytes("v")));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_get_missing_counts_miss() {
        let backend = MemoryCacheBackend::new(10);
        assert_eq!(backend.get("missing").unwrap(), None);

        let stats = backend.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_forget() {
        let backend = MemoryCacheBackend::new(10);
        backend.put("k", bytes("v"), 60).unwrap();

        assert!(backend.forget("k").unwrap());
        assert!(!backend.forget("k").unwrap());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let backend = MemoryCacheBackend::new(10);
        backend.put("k", bytes("v1"), 60).unwrap();
        backend.put("k", bytes("v2"), 60).unwrap();

        assert_eq!(backend.get("k").unwrap(), Some(bytes("v2")));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let backend = MemoryCacheBackend::new(2);
        backend.put("a", bytes("1"), 60).unwrap();
        backend.put("b", bytes("2"), 60).unwrap();
        backend.get("a").unwrap();
        backend.put("c", bytes("3"), 60).unwrap();

        assert_eq!(backend.len(), 2);
        assert_eq!(backend.get("b").unwrap(), None);
        assert!(backend.get("a").unwrap().is_some());
        assert_eq!(backend.stats().evictions, 1);
    }

    #[test]
    fn test_expired_entries_are_misses_and_swept() {
        let backend = MemoryCacheBackend::new(10);
        backend.put("live", bytes("v"), 60).unwrap();
        backend.put("stale", bytes("v"), 60).unwrap();
        backend.entries.lock().map.get_mut("stale").unwrap().expires_at = Some(0);

        assert_eq!(backend.cleanup_expired(), 1);
        assert_eq!(backend.len(), 1);

        backend.entries.lock().map.get_mut("live").unwrap().expires_at = Some(0);
        assert_eq!(backend.get("live").unwrap(), None);
        assert!(backend.is_empty());
    }

    #[test]
    fn test_flush_prefix() {
        let backend = MemoryCacheBackend::new(10);
        backend.put("app:settings:global", bytes("{}"), 60).unwrap();
        backend.put("app:settings:Company:1", bytes("{}"), 60).unwrap();
        backend.put("other:key", bytes("{}"), 60).unwrap();

        assert!(backend.supports_bulk_flush());
        assert_eq!(backend.flush_prefix("app:settings:").unwrap(), 2);
        assert_eq!(backend.len(), 1);
    }
}
