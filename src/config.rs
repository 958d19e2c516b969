//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

// == Defaults ==
const DEFAULT_MAX_CACHE_SIZE: usize = 1000;
const DEFAULT_MAX_ITEM_SIZE: usize = 1024 * 1024; // 1 MiB
const DEFAULT_TTL_MS: u64 = 300_000;
const DEFAULT_COMPRESSION_THRESHOLD: usize = 1024;
const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 60_000;
const DEFAULT_SERVER_PORT: u16 = 3000;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_cache_size: usize,
    /// Largest serialized value (bytes) accepted by `set`
    pub max_item_size: usize,
    /// TTL in milliseconds used when a `set` names neither `ttl` nor `max_age`
    pub default_ttl_ms: u64,
    /// Whether values above the threshold are compressed
    pub compression_enabled: bool,
    /// Serialized size (bytes) above which compression kicks in
    pub compression_threshold_bytes: usize,
    /// Sweeper period in milliseconds
    pub cleanup_interval_ms: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_CACHE_SIZE` - Maximum cache entries (default: 1000, minimum 1)
    /// - `MAX_ITEM_SIZE` - Maximum serialized value size in bytes (default: 1 MiB)
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `COMPRESSION_ENABLED` - `true`/`false` (default: false)
    /// - `COMPRESSION_THRESHOLD_BYTES` - Compression threshold (default: 1024)
    /// - `CLEANUP_INTERVAL_MS` - Sweeper period in milliseconds (default: 60000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_cache_size: env_or("MAX_CACHE_SIZE", defaults.max_cache_size).max(1),
            max_item_size: env_or("MAX_ITEM_SIZE", defaults.max_item_size),
            default_ttl_ms: env_or("DEFAULT_TTL_MS", defaults.default_ttl_ms),
            compression_enabled: env_or("COMPRESSION_ENABLED", defaults.compression_enabled),
            compression_threshold_bytes: env_or(
                "COMPRESSION_THRESHOLD_BYTES",
                defaults.compression_threshold_bytes,
            ),
            cleanup_interval_ms: env_or("CLEANUP_INTERVAL_MS", defaults.cleanup_interval_ms),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Sweeper period as a [`Duration`]. Never zero.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms.max(1))
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            max_item_size: DEFAULT_MAX_ITEM_SIZE,
            default_ttl_ms: DEFAULT_TTL_MS,
            compression_enabled: false,
            compression_threshold_bytes: DEFAULT_COMPRESSION_THRESHOLD,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
            server_port: DEFAULT_SERVER_PORT,
        }
    }
}
