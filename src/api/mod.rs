//! API Module
//!
//! HTTP handlers and routing for the settings REST API.
//!
//! # Endpoints
//! - `GET|DELETE /settings` - All settings of a scope / flush it
//! - `GET|PUT|DELETE /settings/:key` - One setting
//! - `POST /cache/clear` - Evict cached scopes
//! - `POST /defaults/install` - Install default settings
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
