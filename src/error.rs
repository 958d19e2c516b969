//! Error types for the response cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the response cache.
///
/// Only [`CacheError::Serialization`] ever escapes `ResponseCache::set`; the
/// other variants are either degraded internally (logged, then treated as a
/// miss or a `false` outcome) or surface through the HTTP layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Serialized value is larger than the configured item limit
    #[error("Value of {size} bytes exceeds maximum item size of {max} bytes")]
    SizeExceeded { size: usize, max: usize },

    /// Value could not be serialized or deserialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Codec failed to encode a value
    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    /// Stored bytes could not be decoded
    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    /// Resolved expiry is not after the creation time
    #[error("Invalid expiry: {0}")]
    InvalidExpiry(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Background work was requested outside a tokio runtime
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_)
            | CacheError::InvalidExpiry(_)
            | CacheError::Serialization(_) => StatusCode::BAD_REQUEST,
            CacheError::SizeExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::CompressionFailed(_)
            | CacheError::DecompressionFailed(_)
            | CacheError::NoRuntime(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the response cache.
pub type Result<T> = std::result::Result<T, CacheError>;
