//! Expiration Policy Module
//!
//! Staleness checks and expiry resolution for cache entries.

use chrono::{DateTime, Utc};

use crate::cache::CacheEntry;
use crate::error::{CacheError, Result};

// == Is Expired ==
/// Checks whether `entry` is stale at `now` (Unix milliseconds).
///
/// Boundary condition: an entry is expired once `now >= expires_at`, so a
/// TTL of `T` is readable for strictly less than `T` milliseconds.
pub fn is_expired(entry: &CacheEntry, now: u64) -> bool {
    now >= entry.expires_at
}

// == Resolve Expiry ==
/// Computes the absolute expiry (Unix milliseconds) for an entry created at `now`.
///
/// `max_age` is an absolute deadline and wins over the relative `ttl_ms`;
/// when neither is given `default_ttl_ms` applies. A deadline that is not
/// strictly after `now` is rejected.
pub fn resolve_expiry(
    now: u64,
    ttl_ms: Option<u64>,
    max_age: Option<DateTime<Utc>>,
    default_ttl_ms: u64,
) -> Result<u64> {
    let expires_at = match (max_age, ttl_ms) {
        (Some(deadline), _) => u64::try_from(deadline.timestamp_millis()).unwrap_or(0),
        (None, Some(ttl)) => now.saturating_add(ttl),
        (None, None) => now.saturating_add(default_ttl_ms),
    };

    if expires_at <= now {
        return Err(CacheError::InvalidExpiry(format!(
            "expiry {expires_at} is not after creation time {now}"
        )));
    }
    Ok(expires_at)
}
