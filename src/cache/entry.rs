//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and their metadata.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// == Priority ==
/// Caller-assigned importance of an entry.
///
/// Recorded on the entry and reported back, but eviction is pure LRU and
/// never looks at it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

// == Cache Entry ==
/// A single stored value with its metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Serialized value, compressed when `compressed` is set
    pub stored_value: Vec<u8>,
    /// Whether `stored_value` must go through the codec before deserializing
    pub compressed: bool,
    /// Invalidation labels
    pub tags: BTreeSet<String>,
    /// Advisory priority
    pub priority: Priority,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), always after `created_at`
    pub expires_at: u64,
    /// Number of successful reads
    pub access_count: u64,
    /// Last write or successful read (Unix milliseconds)
    pub last_accessed_at: u64,
    /// Size of the serialized value before compression
    pub size_bytes: usize,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped at `now`.
    ///
    /// # Arguments
    /// * `stored_value` - Serialized (possibly compressed) bytes
    /// * `size_bytes` - Size of the uncompressed serialized form
    /// * `now` - Creation time in Unix milliseconds
    /// * `expires_at` - Expiration time in Unix milliseconds
    pub fn new(stored_value: Vec<u8>, size_bytes: usize, now: u64, expires_at: u64) -> Self {
        Self {
            stored_value,
            compressed: false,
            tags: BTreeSet::new(),
            priority: Priority::default(),
            created_at: now,
            expires_at,
            access_count: 0,
            last_accessed_at: now,
            size_bytes,
        }
    }

    /// Marks the stored bytes as codec-encoded.
    pub fn with_compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Attaches invalidation tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the advisory priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds relative to `now` (0 once expired).
    pub fn ttl_remaining_ms(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
