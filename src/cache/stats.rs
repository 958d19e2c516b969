//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, sizes and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Running counters updated by every engine operation.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed retrievals (absent, expired or undecodable)
    pub misses: u64,
    /// Number of stored values
    pub sets: u64,
    /// Number of entries removed by `delete` or tag invalidation
    pub deletes: u64,
    /// Number of entries evicted due to LRU policy
    pub evictions: u64,
    /// Number of values stored compressed
    pub compressions: u64,
    /// Number of entries dropped because they expired
    pub expirations: u64,
    /// Sum of `size_bytes` over all live entries
    pub total_size: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Set ==
    /// Counts a stored value and adds its size to the running total.
    pub fn record_set(&mut self, size_bytes: usize, compressed: bool) {
        self.sets += 1;
        self.total_size += size_bytes;
        if compressed {
            self.compressions += 1;
        }
    }

    // == Size Reconciliation ==
    /// Subtracts the size of an entry that left the store.
    pub fn release(&mut self, size_bytes: usize) {
        self.total_size = self.total_size.saturating_sub(size_bytes);
    }

    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    // == Reset Sizes ==
    /// Zeroes size tracking after the store was emptied. Counters are kept.
    pub fn reset_sizes(&mut self) {
        self.total_size = 0;
    }

    // == Snapshot ==
    /// Freezes the counters together with the store's current occupancy.
    pub fn snapshot(&self, current_size: usize, max_size: usize) -> StatsSnapshot {
        let average_size = if current_size == 0 {
            0.0
        } else {
            self.total_size as f64 / current_size as f64
        };

        StatsSnapshot {
            hits: self.hits,
            misses: self.misses,
            sets: self.sets,
            deletes: self.deletes,
            evictions: self.evictions,
            compressions: self.compressions,
            expirations: self.expirations,
            total_size: self.total_size,
            average_size,
            hit_rate: self.hit_rate(),
            current_size,
            max_size,
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time view of the cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub evictions: u64,
    pub compressions: u64,
    pub expirations: u64,
    /// Bytes held by live entries (pre-compression)
    pub total_size: usize,
    /// `total_size / current_size`, 0 when empty
    pub average_size: f64,
    /// `hits / (hits + misses)`, 0 before any read
    pub hit_rate: f64,
    /// Number of live entries
    pub current_size: usize,
    /// Configured capacity
    pub max_size: usize,
}
