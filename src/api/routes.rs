//! API Routes
//!
//! Configures the Axum router with all settings endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    all_settings_handler, clear_cache_handler, flush_handler, forget_handler,
    get_setting_handler, health_handler, install_defaults_handler, put_setting_handler,
    stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /settings` - All settings of the scope
/// - `DELETE /settings` - Flush the scope
/// - `GET /settings/:key` - Read one setting
/// - `PUT /settings/:key` - Store one setting
/// - `DELETE /settings/:key` - Forget one setting
/// - `POST /cache/clear` - Evict cached scopes
/// - `POST /defaults/install` - Install default settings
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// Settings endpoints take the tenant from `tenant_type` / `tenant_id` query parameters.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/settings", get(all_settings_handler).delete(flush_handler))
        .route(
            "/settings/:key",
            get(get_setting_handler)
                .put(put_setting_handler)
                .delete(forget_handler),
        )
        .route("/cache/clear", post(clear_cache_handler))
        .route("/defaults/install", post(install_defaults_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
