//! LRU Index Module
//!
//! Implements Least Recently Used ordering and victim selection for eviction.

use std::collections::{BTreeMap, HashMap};

use crate::cache::{CacheKey, CacheStore};

// == LRU Index ==
/// Orders keys by their most recent write or read.
///
/// Every touch draws a fresh, strictly increasing sequence number, so the
/// smallest sequence always belongs to the entry with the oldest
/// `last_accessed_at`, and entries touched within the same millisecond are
/// still ordered by when they were touched.
#[derive(Debug, Default)]
pub struct LruIndex {
    /// Sequence number -> key, oldest first
    order: BTreeMap<u64, CacheKey>,
    /// Key -> its current sequence number
    positions: HashMap<CacheKey, u64>,
    /// Next sequence number to hand out
    next_seq: u64,
}

impl LruIndex {
    // == Constructor ==
    /// Creates a new empty LRU index.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used.
    ///
    /// If key exists, its previous position is dropped first.
    pub fn touch(&mut self, key: &CacheKey) {
        self.remove(key);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        self.positions.insert(key.clone(), seq);
    }

    // == Remove ==
    /// Removes a key from the index.
    pub fn remove(&mut self, key: &CacheKey) {
        if let Some(seq) = self.positions.remove(key) {
            self.order.remove(&seq);
        }
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&CacheKey> {
        self.order.values().next()
    }

    // == Clear ==
    /// Drops every tracked key.
    pub fn clear(&mut self) {
        self.order.clear();
        self.positions.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    #[cfg(test)]
    pub(crate) fn contains(&self, key: &CacheKey) -> bool {
        self.positions.contains_key(key)
    }
}

// == Eviction Policy ==
/// Picks the next victim when the store holds more than `max_entries`.
///
/// Returns `None` while the store is within bound. Priority is never
/// consulted.
pub fn select_victim(store: &CacheStore, max_entries: usize) -> Option<CacheKey> {
    if store.len() <= max_entries {
        return None;
    }
    store.least_recently_used().cloned()
}
