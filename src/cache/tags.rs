//! Tag Index Module
//!
//! Inverted index from tag to the keys currently carrying it.

use std::collections::{HashMap, HashSet};

use crate::cache::CacheKey;

// == Tag Index ==
/// Maps each tag to the set of live keys holding it.
///
/// Maintained incrementally on every insert and removal, so a lookup costs
/// only the size of the requested buckets. Empty buckets are dropped.
#[derive(Debug, Default)]
pub struct TagIndex {
    buckets: HashMap<String, HashSet<CacheKey>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // == Attach ==
    /// Adds `key` to the bucket of every tag in `tags`.
    pub fn attach<'a, I>(&mut self, key: &CacheKey, tags: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for tag in tags {
            self.buckets
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
    }

    // == Detach ==
    /// Removes `key` from the bucket of every tag in `tags`.
    pub fn detach<'a, I>(&mut self, key: &CacheKey, tags: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for tag in tags {
            if let Some(keys) = self.buckets.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.buckets.remove(tag);
                }
            }
        }
    }

    // == Keys For Tags ==
    /// Union of the keys holding any of `tags`.
    pub fn keys_for_tags<S: AsRef<str>>(&self, tags: &[S]) -> HashSet<CacheKey> {
        tags.iter()
            .filter_map(|tag| self.buckets.get(tag.as_ref()))
            .flat_map(|keys| keys.iter().cloned())
            .collect()
    }

    /// Number of keys carrying `tag`.
    pub fn count(&self, tag: &str) -> usize {
        self.buckets.get(tag).map_or(0, HashSet::len)
    }

    /// Number of distinct tags in use.
    pub fn tag_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
