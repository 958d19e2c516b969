//! Cache Store Module
//!
//! Authoritative key -> entry map with LRU bookkeeping and size enforcement.

use std::collections::HashMap;

use crate::cache::{CacheEntry, CacheKey, LruIndex};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Holds entries and their access order.
///
/// The store only knows about single entries. Tag bookkeeping, statistics and
/// capacity enforcement are layered on top by the engine, which reacts to the
/// entries handed back from [`CacheStore::put`] and [`CacheStore::remove`].
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<CacheKey, CacheEntry>,
    /// LRU access order
    lru: LruIndex,
    /// Largest accepted serialized value in bytes
    max_item_size: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store accepting values up to `max_item_size` bytes.
    pub fn new(max_item_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruIndex::new(),
            max_item_size,
        }
    }

    // == Put ==
    /// Inserts or overwrites an entry.
    ///
    /// Returns the replaced entry when the key already existed. Entries whose
    /// `size_bytes` exceed the item limit are rejected without touching the
    /// store.
    pub fn put(&mut self, key: CacheKey, entry: CacheEntry) -> Result<Option<CacheEntry>> {
        if entry.size_bytes > self.max_item_size {
            return Err(CacheError::SizeExceeded {
                size: entry.size_bytes,
                max: self.max_item_size,
            });
        }

        self.lru.touch(&key);
        Ok(self.entries.insert(key, entry))
    }

    // == Get ==
    /// Returns the entry for `key` without updating access metadata.
    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Touch ==
    /// Records a successful read at `now`. No-op if the key is absent.
    pub fn touch(&mut self, key: &CacheKey, now: u64) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_accessed_at = now;
            entry.access_count += 1;
            self.lru.touch(key);
        }
    }

    // == Remove ==
    /// Removes an entry, handing it back so callers can reconcile tags and sizes.
    pub fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.lru.remove(key);
        }
        removed
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    // == Least Recently Used ==
    /// Returns the key with the oldest access, if any.
    pub fn least_recently_used(&self) -> Option<&CacheKey> {
        self.lru.peek_oldest()
    }

    // == Iterate ==
    /// Iterates over all entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&CacheKey, &CacheEntry)> {
        self.entries.iter()
    }

    // == Length ==
    /// Returns the current number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(size: usize, now: u64) -> CacheEntry {
        CacheEntry::new(vec![0; size], size, now, now + 60_000)
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(1024);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_put_and_get() {
        let mut store = CacheStore::new(1024);

        let replaced = store.put("key1".into(), entry(8, 0)).unwrap();
        assert!(replaced.is_none());

        let stored = store.get(&CacheKey::from("key1")).unwrap();
        assert_eq!(stored.size_bytes, 8);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_put_overwrite_returns_previous() {
        let mut store = CacheStore::new(1024);

        store.put("key1".into(), entry(8, 0)).unwrap();
        let replaced = store.put("key1".into(), entry(16, 5)).unwrap();

        assert_eq!(replaced.unwrap().size_bytes, 8);
        assert_eq!(store.get(&CacheKey::from("key1")).unwrap().size_bytes, 16);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_put_rejects_oversize() {
        let mut store = CacheStore::new(100);

        let result = store.put("big".into(), entry(101, 0));
        assert!(matches!(
            result,
            Err(CacheError::SizeExceeded { size: 101, max: 100 })
        ));
        assert!(store.is_empty());

        // Exactly at the limit is accepted
        assert!(store.put("edge".into(), entry(100, 0)).is_ok());
    }

    #[test]
    fn test_store_touch_updates_metadata() {
        let mut store = CacheStore::new(1024);
        store.put("key1".into(), entry(1, 10)).unwrap();

        store.touch(&CacheKey::from("key1"), 42);
        store.touch(&CacheKey::from("missing"), 42);

        let stored = store.get(&CacheKey::from("key1")).unwrap();
        assert_eq!(stored.last_accessed_at, 42);
        assert_eq!(stored.access_count, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_remove() {
        let mut store = CacheStore::new(1024);
        store.put("key1".into(), entry(1, 0)).unwrap();

        let removed = store.remove(&CacheKey::from("key1"));
        assert!(removed.is_some());
        assert!(store.is_empty());
        assert!(store.least_recently_used().is_none());
        assert!(store.remove(&CacheKey::from("key1")).is_none());
    }

    #[test]
    fn test_store_lru_follows_touch() {
        let mut store = CacheStore::new(1024);

        store.put("key1".into(), entry(1, 0)).unwrap();
        store.put("key2".into(), entry(1, 0)).unwrap();
        store.put("key3".into(), entry(1, 0)).unwrap();
        assert_eq!(store.least_recently_used(), Some(&CacheKey::from("key1")));

        // Access key1 to make it most recently used
        store.touch(&CacheKey::from("key1"), 1);
        assert_eq!(store.least_recently_used(), Some(&CacheKey::from("key2")));
    }

    #[test]
    fn test_store_clear() {
        let mut store = CacheStore::new(1024);
        store.put("a".into(), entry(1, 0)).unwrap();
        store.put("b".into(), entry(1, 0)).unwrap();

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.iter().count(), 0);
    }
}
