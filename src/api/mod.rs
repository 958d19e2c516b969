//! API Module
//!
//! HTTP handlers and routing exposing the cache to dashboards and
//! invalidation jobs running outside the process.
//!
//! # Endpoints
//! - `PUT /set` - Store a JSON value
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `POST /invalidate` - Invalidate entries by tag
//! - `POST /clear` - Drop all entries
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
