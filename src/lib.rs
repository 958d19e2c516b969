//! Response Cache - an in-process cache for expensive-to-recompute values
//!
//! Provides TTL expiration, LRU eviction, tag-based invalidation, optional
//! LZ4 compression and hit/miss statistics, plus an HTTP surface for
//! callers outside the process.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheKey, Priority, ResponseCache, SetOptions};
pub use config::Config;
pub use error::{CacheError, Result};
