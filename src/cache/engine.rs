//! Response Cache Engine
//!
//! Public facade composing the store, tag index, codec, statistics and the
//! background sweeper behind a single lock.

use std::borrow::Cow;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::expiration::{is_expired, resolve_expiry};
use crate::cache::lru::select_victim;
use crate::cache::{
    CacheEntry, CacheKey, CacheStats, CacheStore, Codec, Lz4Codec, Priority, StatsSnapshot,
    TagIndex,
};
use crate::config::Config;
use crate::error::Result;
use crate::tasks::{spawn_sweeper, SweeperHandle};

/// TTL in milliseconds of the entry built by [`ResponseCache::health_check`].
const HEALTH_PROBE_TTL_MS: u64 = 5_000;

// == Set Options ==
/// Per-call options for [`ResponseCache::set`].
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Relative lifetime; falls back to the configured default TTL
    pub ttl: Option<Duration>,
    /// Absolute deadline; wins over `ttl` when both are given
    pub max_age: Option<DateTime<Utc>>,
    /// Invalidation labels
    pub tags: Vec<String>,
    /// Advisory priority, not used for eviction
    pub priority: Priority,
    /// Overrides the configured compression switch for this value
    pub compress: Option<bool>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn max_age(mut self, deadline: DateTime<Utc>) -> Self {
        self.max_age = Some(deadline);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }
}

// == Batch Outcome ==
/// Result of storing one value from a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSetOutcome {
    pub key: CacheKey,
    pub success: bool,
}

// == Health Report ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Outcome of a probe write/read/delete round trip.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub stats: StatsSnapshot,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

// == Cache State ==
/// Everything guarded by the engine lock.
#[derive(Debug)]
struct CacheState {
    store: CacheStore,
    tags: TagIndex,
    stats: CacheStats,
}

impl CacheState {
    /// Removes an entry and reconciles the tag index and size total.
    ///
    /// Callers record which kind of removal it was.
    fn remove_entry(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let removed = self.store.remove(key)?;
        self.tags.detach(key, &removed.tags);
        self.stats.release(removed.size_bytes);
        Some(removed)
    }

    /// Evicts least recently used entries until the store fits `max_entries`.
    fn enforce_capacity(&mut self, max_entries: usize) -> usize {
        let mut evicted = 0;
        while let Some(victim) = select_victim(&self.store, max_entries) {
            if self.remove_entry(&victim).is_none() {
                break;
            }
            self.stats.record_eviction();
            debug!(key = %victim, "Evicted least recently used entry");
            evicted += 1;
        }
        evicted
    }

    /// Drops every entry that is stale at `now`.
    fn purge_expired(&mut self, now: u64) -> usize {
        let expired: Vec<CacheKey> = self
            .store
            .iter()
            .filter(|(_, entry)| is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            if self.remove_entry(key).is_some() {
                self.stats.record_expiration();
            }
        }
        expired.len()
    }
}

struct CacheInner {
    config: Config,
    codec: Box<dyn Codec>,
    state: Mutex<CacheState>,
    sweeper: Mutex<Option<SweeperHandle>>,
}

// == Response Cache ==
/// In-process cache with TTL expiration, LRU eviction, tag invalidation and
/// optional compression.
///
/// Cloning is cheap and every clone shares the same entries. All operations
/// are synchronous; the only background activity is the sweeper started by
/// [`ResponseCache::start`].
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<CacheInner>,
}

/// Non-owning handle held by the sweeper task.
#[derive(Clone)]
pub(crate) struct WeakResponseCache {
    inner: Weak<CacheInner>,
}

impl WeakResponseCache {
    pub(crate) fn upgrade(&self) -> Option<ResponseCache> {
        self.inner.upgrade().map(|inner| ResponseCache { inner })
    }
}

impl ResponseCache {
    // == Constructors ==
    /// Creates a cache using LZ4 for compressed values.
    pub fn new(config: Config) -> Self {
        Self::with_codec(config, Lz4Codec::new())
    }

    /// Creates a cache with a custom compression codec.
    pub fn with_codec(mut config: Config, codec: impl Codec + 'static) -> Self {
        config.max_cache_size = config.max_cache_size.max(1);
        let state = CacheState {
            store: CacheStore::new(config.max_item_size),
            tags: TagIndex::new(),
            stats: CacheStats::new(),
        };

        Self {
            inner: Arc::new(CacheInner {
                config,
                codec: Box::new(codec),
                state: Mutex::new(state),
                sweeper: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub(crate) fn downgrade(&self) -> WeakResponseCache {
        WeakResponseCache {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // == Lifecycle ==
    /// Starts the background sweeper on the current tokio runtime.
    ///
    /// Calling `start` while a sweeper is already running is a no-op.
    pub fn start(&self) -> Result<()> {
        let mut slot = self.inner.sweeper.lock();
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Sweeper already running");
            return Ok(());
        }

        let handle = spawn_sweeper(self.downgrade(), self.inner.config.cleanup_interval())?;
        *slot = Some(handle);
        Ok(())
    }

    /// Signals the sweeper to stop and waits for any pass in flight.
    ///
    /// Once this returns no further sweep touches the store.
    pub fn stop(&self) {
        if self.take_sweeper().is_some() {
            info!("Sweeper stopped");
        }
    }

    /// Stops the sweeper and waits for its task to finish.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.take_sweeper() {
            handle.join().await;
            info!("Sweeper shut down");
        }
    }

    /// Returns true while a sweeper task is alive.
    pub fn is_running(&self) -> bool {
        self.inner
            .sweeper
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn take_sweeper(&self) -> Option<SweeperHandle> {
        let handle = self.inner.sweeper.lock().take()?;
        handle.signal_stop();
        // A pass holds the state lock for its whole duration
        drop(self.inner.state.lock());
        Some(handle)
    }

    /// Runs one sweep unless `stopped` reports a stop request.
    ///
    /// `stopped` is evaluated while holding the state lock, so a stop that
    /// completed before the lock was taken is always observed.
    pub(crate) fn sweep(&self, stopped: impl FnOnce() -> bool) -> Option<usize> {
        let mut state = self.inner.state.lock();
        if stopped() {
            return None;
        }
        Some(state.purge_expired(current_timestamp_ms()))
    }

    // == Set ==
    /// Stores `value` under `key`.
    ///
    /// Returns `Ok(false)` without mutating anything when the serialized value
    /// exceeds `max_item_size` or the resolved expiry is not in the future.
    /// Serialization failures are the only error returned.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: impl Into<CacheKey>,
        value: &T,
        opts: &SetOptions,
    ) -> Result<bool> {
        let key = key.into();
        let serialized = serde_json::to_vec(value)?;
        let size_bytes = serialized.len();

        let max_item_size = self.inner.config.max_item_size;
        if size_bytes > max_item_size {
            warn!(
                key = %key,
                size_bytes,
                max_item_size,
                "Value exceeds maximum item size, not caching"
            );
            return Ok(false);
        }

        let now = current_timestamp_ms();
        let ttl_ms = opts
            .ttl
            .map(|ttl| u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));
        let expires_at =
            match resolve_expiry(now, ttl_ms, opts.max_age, self.inner.config.default_ttl_ms) {
                Ok(expires_at) => expires_at,
                Err(err) => {
                    warn!(key = %key, error = %err, "Rejected entry with invalid expiry");
                    return Ok(false);
                }
            };

        let (stored_value, compressed) = self.maybe_compress(&key, serialized, opts);
        let entry = CacheEntry::new(stored_value, size_bytes, now, expires_at)
            .with_compressed(compressed)
            .with_tags(opts.tags.iter().cloned())
            .with_priority(opts.priority);
        let tags = entry.tags.clone();

        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        match state.store.put(key.clone(), entry) {
            Ok(Some(previous)) => {
                state.tags.detach(&key, &previous.tags);
                state.stats.release(previous.size_bytes);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(key = %key, error = %err, "Store rejected entry");
                return Ok(false);
            }
        }
        state.tags.attach(&key, &tags);
        state.stats.record_set(size_bytes, compressed);

        let evicted = state.enforce_capacity(self.inner.config.max_cache_size);
        debug!(key = %key, size_bytes, compressed, evicted, "Stored entry");
        Ok(true)
    }

    fn maybe_compress(
        &self,
        key: &CacheKey,
        serialized: Vec<u8>,
        opts: &SetOptions,
    ) -> (Vec<u8>, bool) {
        let config = &self.inner.config;
        let enabled = opts.compress.unwrap_or(config.compression_enabled);
        if !enabled || serialized.len() <= config.compression_threshold_bytes {
            return (serialized, false);
        }

        match self.inner.codec.encode(&serialized) {
            Ok(encoded) => {
                debug!(
                    key = %key,
                    codec = self.inner.codec.name(),
                    original = serialized.len(),
                    compressed = encoded.len(),
                    "Compressed value"
                );
                (encoded, true)
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Compression failed, storing uncompressed");
                (serialized, false)
            }
        }
    }

    // == Get ==
    /// Returns the value stored under `key`, or `None` on a miss.
    ///
    /// Expired entries are removed on sight. Entries that cannot be decoded
    /// into `T` are removed, logged and reported as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: impl Into<CacheKey>) -> Option<T> {
        let key = key.into();
        let now = current_timestamp_ms();

        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        let Some(entry) = state.store.get(&key) else {
            state.stats.record_miss();
            return None;
        };

        if is_expired(entry, now) {
            state.remove_entry(&key);
            state.stats.record_expiration();
            state.stats.record_miss();
            debug!(key = %key, "Entry expired on read");
            return None;
        }

        let ttl_remaining_ms = entry.ttl_remaining_ms(now);
        match self.decode_entry::<T>(entry) {
            Ok(value) => {
                state.store.touch(&key, now);
                state.stats.record_hit();
                debug!(key = %key, ttl_remaining_ms, "Cache hit");
                Some(value)
            }
            Err(err) => {
                error!(key = %key, error = %err, "Dropping undecodable cache entry");
                state.remove_entry(&key);
                state.stats.record_miss();
                None
            }
        }
    }

    fn decode_entry<T: DeserializeOwned>(&self, entry: &CacheEntry) -> Result<T> {
        let bytes = if entry.compressed {
            Cow::Owned(self.inner.codec.decode(&entry.stored_value)?)
        } else {
            Cow::Borrowed(entry.stored_value.as_slice())
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    // == Delete ==
    /// Removes `key`. Returns whether an entry was present.
    pub fn delete(&self, key: impl Into<CacheKey>) -> bool {
        let key = key.into();
        let mut state = self.inner.state.lock();
        let removed = state.remove_entry(&key).is_some();
        if removed {
            state.stats.record_delete();
        }
        removed
    }

    // == Invalidate By Tags ==
    /// Deletes every entry carrying at least one of `tags`; returns how many.
    pub fn invalidate_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> usize {
        let mut state = self.inner.state.lock();
        let keys = state.tags.keys_for_tags(tags);

        let mut removed = 0;
        for key in &keys {
            if state.remove_entry(key).is_some() {
                state.stats.record_delete();
                removed += 1;
            }
        }

        let requested: Vec<&str> = tags.iter().map(|tag| tag.as_ref()).collect();
        info!(tags = ?requested, removed, "Invalidated entries by tag");
        removed
    }

    // == Clear ==
    /// Drops every entry. Hit/miss and operation counters are kept.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        let dropped = state.store.len();
        state.store.clear();
        state.tags.clear();
        state.stats.reset_sizes();
        info!(dropped, "Cache cleared");
    }

    // == Purge Expired ==
    /// Removes all expired entries now, independent of the sweeper.
    pub fn purge_expired(&self) -> usize {
        self.inner.state.lock().purge_expired(current_timestamp_ms())
    }

    // == Stats ==
    pub fn stats(&self) -> StatsSnapshot {
        let state = self.inner.state.lock();
        state
            .stats
            .snapshot(state.store.len(), self.inner.config.max_cache_size)
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().store.is_empty()
    }

    /// Returns true if `key` holds an entry that has not expired.
    pub fn contains_key(&self, key: impl Into<CacheKey>) -> bool {
        let key = key.into();
        let now = current_timestamp_ms();
        self.inner
            .state
            .lock()
            .store
            .get(&key)
            .is_some_and(|entry| !is_expired(entry, now))
    }

    // == Cache Function ==
    /// Returns the cached value for `key`, or runs `producer` and caches its result.
    ///
    /// Producer errors are returned untouched and nothing is cached. The
    /// engine lock is not held while the producer runs.
    pub async fn cache_function<T, E, F, Fut>(
        &self,
        key: impl Into<CacheKey>,
        opts: &SetOptions,
        producer: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let key = key.into();
        if let Some(cached) = self.get::<T>(&key) {
            return Ok(cached);
        }

        let value = producer().await?;
        match self.set(&key, &value, opts) {
            Ok(true) => {}
            Ok(false) => debug!(key = %key, "Produced value was not cached"),
            Err(err) => warn!(key = %key, error = %err, "Produced value could not be cached"),
        }
        Ok(value)
    }

    // == Batch Operations ==
    /// Looks up each key in turn.
    pub fn batch_get<T, K, I>(&self, keys: I) -> HashMap<CacheKey, Option<T>>
    where
        T: DeserializeOwned,
        K: Into<CacheKey>,
        I: IntoIterator<Item = K>,
    {
        keys.into_iter()
            .map(|key| {
                let key = key.into();
                let value = self.get(&key);
                (key, value)
            })
            .collect()
    }

    /// Stores each entry in turn with the same options.
    pub fn batch_set<T, K, I>(&self, entries: I, opts: &SetOptions) -> Vec<BatchSetOutcome>
    where
        T: Serialize,
        K: Into<CacheKey>,
        I: IntoIterator<Item = (K, T)>,
    {
        entries
            .into_iter()
            .map(|(key, value)| {
                let key = key.into();
                let success = match self.set(&key, &value, opts) {
                    Ok(stored) => stored,
                    Err(err) => {
                        warn!(key = %key, error = %err, "Batch entry could not be cached");
                        false
                    }
                };
                BatchSetOutcome { key, success }
            })
            .collect()
    }

    /// Preloads entries with default options, typically at startup.
    pub fn warm_cache<T, K, I>(&self, entries: I) -> Vec<BatchSetOutcome>
    where
        T: Serialize,
        K: Into<CacheKey>,
        I: IntoIterator<Item = (K, T)>,
    {
        let outcomes = self.batch_set(entries, &SetOptions::default());
        let loaded = outcomes.iter().filter(|o| o.success).count();
        info!(loaded, total = outcomes.len(), "Cache warm-up complete");
        outcomes
    }

    // == Health Check ==
    /// Round-trips a probe value through the codec and the store.
    ///
    /// The probe is inserted and removed under a single lock acquisition and
    /// bypasses capacity enforcement and statistics, so caller entries are
    /// never evicted by it.
    pub fn health_check(&self) -> HealthReport {
        let timestamp = Utc::now();
        let nonce = timestamp.timestamp_nanos_opt().unwrap_or_default();

        let status = match self.probe_round_trip(nonce) {
            Ok(true) => HealthStatus::Healthy,
            Ok(false) => {
                warn!("Cache health probe read back a different value");
                HealthStatus::Unhealthy
            }
            Err(err) => {
                warn!(error = %err, "Cache health probe failed");
                HealthStatus::Unhealthy
            }
        };

        HealthReport {
            status,
            stats: self.stats(),
            timestamp,
        }
    }

    fn probe_round_trip(&self, nonce: i64) -> Result<bool> {
        let probe_key = CacheKey::new(format!("__health_probe__:{nonce}"));
        let serialized = serde_json::to_vec(&nonce)?;
        let size_bytes = serialized.len();

        let now = current_timestamp_ms();
        let expires_at = resolve_expiry(
            now,
            Some(HEALTH_PROBE_TTL_MS),
            None,
            self.inner.config.default_ttl_ms,
        )?;
        let (stored_value, compressed) =
            self.maybe_compress(&probe_key, serialized, &SetOptions::new());
        let entry =
            CacheEntry::new(stored_value, size_bytes, now, expires_at).with_compressed(compressed);

        let mut state = self.inner.state.lock();
        if state.store.get(&probe_key).is_some() {
            // Never overwrite a caller entry that happens to share the name
            return Ok(false);
        }
        state.store.put(probe_key.clone(), entry)?;
        let decoded = state
            .store
            .get(&probe_key)
            .map(|entry| self.decode_entry::<i64>(entry));
        state.store.remove(&probe_key);

        Ok(matches!(decoded, Some(Ok(value)) if value == nonce))
    }
}

#[cfg(test)]
impl ResponseCache {
    /// Verifies capacity, tag index and size bookkeeping against the store.
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        let state = self.inner.state.lock();

        if state.store.len() > self.inner.config.max_cache_size {
            return Err(format!("{} entries exceed capacity", state.store.len()));
        }

        let total: usize = state.store.iter().map(|(_, e)| e.size_bytes).sum();
        if total != state.stats.total_size {
            return Err(format!("total_size {} != live sum {total}", state.stats.total_size));
        }

        let mut tagged = 0;
        for (key, entry) in state.store.iter() {
            for tag in &entry.tags {
                if !state.tags.keys_for_tags(&[tag]).contains(key) {
                    return Err(format!("{key} missing from tag bucket {tag}"));
                }
                tagged += 1;
            }
        }
        let live_tags: std::collections::HashSet<&String> = state
            .store
            .iter()
            .flat_map(|(_, e)| e.tags.iter())
            .collect();
        let indexed: usize = live_tags.iter().map(|tag| state.tags.count(tag)).sum();
        if indexed != tagged {
            return Err(format!("tag index holds {indexed} links, store has {tagged}"));
        }
        if state.tags.tag_count() != live_tags.len() {
            return Err("tag index holds stale buckets".to_string());
        }
        Ok(())
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("config", &self.inner.config)
            .field("codec", &self.inner.codec.name())
            .field("len", &self.len())
            .finish()
    }
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.signal_stop();
        }
    }
}
