//! Cache Key Module
//!
//! Deterministic keys derived from plain strings or structured values.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Prefix marking keys produced by hashing a structured value.
const HASHED_PREFIX: &str = "h:";

// == Cache Key ==
/// Opaque cache key.
///
/// String keys are used verbatim. Structured keys are serialized to
/// canonical JSON (object members sorted by name) and hashed with SHA-256,
/// so two equal values always map to the same key regardless of field order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key from a caller-supplied string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives a key from any serializable value.
    pub fn hashed<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let canonical = canonical_json(value)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(Self(format!(
            "{HASHED_PREFIX}{}",
            hex::encode(hasher.finalize())
        )))
    }

    /// Derives a key for a memoized function: `namespace` plus its hashed arguments.
    ///
    /// The namespace is length-prefixed so `("a:b", x)` and `("a", "b:" ++ x)`
    /// cannot collide.
    pub fn derive<A: Serialize + ?Sized>(namespace: &str, args: &A) -> Result<Self> {
        let canonical = canonical_json(args)?;
        let mut hasher = Sha256::new();
        hasher.update((namespace.len() as u64).to_le_bytes());
        hasher.update(namespace.as_bytes());
        hasher.update(canonical.as_bytes());
        Ok(Self(format!("{namespace}:{}", hex::encode(hasher.finalize()))))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Serializes through `serde_json::Value`, whose map type keeps keys sorted.
fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&value)?)
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&String> for CacheKey {
    fn from(key: &String) -> Self {
        Self(key.clone())
    }
}

impl From<&CacheKey> for CacheKey {
    fn from(key: &CacheKey) -> Self {
        key.clone()
    }
}
