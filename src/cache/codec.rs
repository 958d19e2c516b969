//! Compression Codec Module
//!
//! Reversible byte transforms applied to large serialized values.

use crate::error::{CacheError, Result};

// == Codec Trait ==
/// Reversible transform over serialized values.
///
/// `decode(encode(x)) == x` must hold for every input. Implementations must
/// report corrupt input as an error rather than panic.
pub trait Codec: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Encodes `data`.
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decodes bytes previously produced by [`Codec::encode`].
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>>;
}

// == LZ4 Codec ==
const DEFAULT_LEVEL: i32 = 4;

/// LZ4 block compression with the uncompressed size prepended.
#[derive(Debug, Clone, Copy)]
pub struct Lz4Codec {
    level: i32,
}

impl Lz4Codec {
    /// Creates an LZ4 codec in high-compression mode at the default level.
    pub fn new() -> Self {
        Self::with_level(DEFAULT_LEVEL)
    }

    /// Creates an LZ4 codec with a custom high-compression level.
    pub fn with_level(level: i32) -> Self {
        Self { level }
    }
}

impl Default for Lz4Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        lz4::block::compress(
            data,
            Some(lz4::block::CompressionMode::HIGHCOMPRESSION(self.level)),
            true,
        )
        .map_err(|e| CacheError::CompressionFailed(e.to_string()))
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        lz4::block::decompress(data, None)
            .map_err(|e| CacheError::DecompressionFailed(e.to_string()))
    }
}
