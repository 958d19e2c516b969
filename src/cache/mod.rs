//! Cache Module
//!
//! Provides in-process caching with TTL expiration, LRU eviction, tag
//! invalidation and optional compression.

mod codec;
mod engine;
mod entry;
mod expiration;
mod key;
mod lru;
mod stats;
mod store;
mod tags;


// Re-export public types
pub use codec::{Codec, Lz4Codec};
pub use engine::{BatchSetOutcome, HealthReport, HealthStatus, ResponseCache, SetOptions};
pub use entry::{current_timestamp_ms, CacheEntry, Priority};
pub use expiration::{is_expired, resolve_expiry};
pub use key::CacheKey;
pub use lru::{select_victim, LruIndex};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::CacheStore;
pub use tags::TagIndex;

pub(crate) use engine::WeakResponseCache;

// == Public Constants ==
/// Maximum allowed key length in bytes for keys arriving over HTTP
pub const MAX_KEY_LENGTH: usize = 256;
