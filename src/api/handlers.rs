//! API Handlers
//!
//! HTTP request handlers exposing the cache facade to out-of-process callers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::debug;

use crate::cache::{HealthReport, ResponseCache, StatsSnapshot};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, InvalidateRequest, InvalidateResponse,
    SetRequest, SetResponse,
};

/// Application state shared across all handlers.
///
/// The cache is internally synchronized, so cloning the state is cheap and
/// handlers need no extra locking.
#[derive(Clone)]
pub struct AppState {
    pub cache: ResponseCache,
}

impl AppState {
    /// Creates a new AppState around an existing cache.
    pub fn new(cache: ResponseCache) -> Self {
        Self { cache }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(ResponseCache::new(config.clone()))
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    if state.cache.set(req.key.as_str(), &req.value, &req.options())? {
        return Ok(Json(SetResponse::new(req.key)));
    }

    // Rejected: report oversize values as such
    let size = serde_json::to_vec(&req.value)?.len();
    let max = state.cache.config().max_item_size;
    if size > max {
        return Err(CacheError::SizeExceeded { size, max });
    }
    Err(CacheError::InvalidRequest(format!(
        "Key '{}' was not cached",
        req.key
    )))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value: Value = state
        .cache
        .get(key.as_str())
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.delete(key.as_str()) {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for POST /invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let removed = state.cache.invalidate_by_tags(req.tags.as_slice());
    Ok(Json(InvalidateResponse {
        tags: req.tags,
        removed,
    }))
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear();
    Json(ClearResponse::cleared())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.cache.stats())
}

/// Handler for GET /health
///
/// Runs a probe round trip through the cache; answers 503 if it fails.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.cache.health_check();
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    debug!(status = %status, "Health check served");
    (status, Json(report))
}
