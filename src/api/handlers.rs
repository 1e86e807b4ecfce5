//! API Handlers
//!
//! HTTP request handlers for each settings endpoint. Every settings handler
//! resolves its tenant scope from the `tenant_type` / `tenant_id` query.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::warn;

use crate::cache::{CacheLayer, MemoryCacheBackend};
use crate::config::{Config, StoreKind};
use crate::engine::{CacheTarget, SettingsEngine};
use crate::error::{Result, SettingsError};
use crate::models::requests::validate_key;
use crate::models::{
    AllSettingsResponse, ClearCacheRequest, ClearCacheResponse, DeleteResponse, HealthResponse,
    InstallDefaultsRequest, InstallResponse, SetSettingRequest, SettingResponse, StatsResponse,
    TenantQuery,
};
use crate::store::{MemorySettingsStore, SettingsMap, SettingsStore, SqliteSettingsStore};
use crate::tenant::{OpenLookup, TenantPolicy};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Unbound engine; handlers bind per request
    pub engine: SettingsEngine,
    /// Cache backend behind the engine's cache layer, for stats and sweeping
    pub backend: Arc<MemoryCacheBackend>,
    /// Defaults installed by `POST /defaults/install` without a body override
    pub defaults: Arc<SettingsMap>,
}

impl AppState {
    pub fn new(engine: SettingsEngine, backend: Arc<MemoryCacheBackend>) -> Self {
        Self {
            engine,
            backend,
            defaults: Arc::new(SettingsMap::new()),
        }
    }

    pub fn with_defaults(mut self, defaults: SettingsMap) -> Self {
        self.defaults = Arc::new(defaults);
        self
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens the configured store and wires the in-memory cache backend.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.cache_store != "memory" {
            warn!(cache_store = %config.cache_store, "Unsupported cache store, using memory");
        }

        let backend = Arc::new(MemoryCacheBackend::new(config.cache_max_entries));
        let cache = CacheLayer::new(
            backend.clone(),
            config.cache_prefix.clone(),
            config.cache_ttl_seconds,
        )
        .with_enabled(config.cache_enabled);

        let store: Arc<dyn SettingsStore> = match config.store {
            StoreKind::Sqlite => Arc::new(SqliteSettingsStore::open(
                &config.database_path,
                &config.table_name,
                &config.tenant_column_prefix,
            )?),
            StoreKind::Memory => Arc::new(MemorySettingsStore::new()),
        };

        let policy = TenantPolicy::new(config.tenancy_config());
        if let Err(e) = policy.check_config() {
            warn!(error = %e, "Tenant-scoped requests will fail until tenancy is configured");
        }

        let engine = SettingsEngine::new(
            policy,
            store,
            Arc::new(cache),
            Arc::new(OpenLookup),
        );
        Ok(Self::new(engine, backend))
    }

    /// Engine for the tenant named by the query, or the global engine.
    fn scoped(&self, query: &TenantQuery) -> Result<SettingsEngine> {
        match (query.tenant_id, query.tenant_type.as_deref()) {
            (None, None) => Ok(self.engine.clone()),
            (Some(id), model_type) => self.engine.bind_tenant_by_id(id, model_type),
            (None, Some(_)) => Err(SettingsError::InvalidRequest(
                "tenant_id is required when tenant_type is given".to_string(),
            )),
        }
    }
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(message) => Err(SettingsError::InvalidRequest(message)),
        None => Ok(()),
    }
}

/// Runs synchronous engine work off the async worker threads.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

/// Handler for GET /settings
pub async fn all_settings_handler(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<AllSettingsResponse>> {
    let response = blocking(move || {
        let engine = state.scoped(&query)?;
        Ok(AllSettingsResponse {
            settings: engine.all()?,
            scope: engine.scope_key(),
        })
    })
    .await?;

    Ok(Json(response))
}

/// Handler for DELETE /settings
pub async fn flush_handler(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<DeleteResponse>> {
    let scope = blocking(move || {
        let engine = state.scoped(&query)?;
        engine.flush()?;
        Ok(engine.scope_key())
    })
    .await?;

    Ok(Json(DeleteResponse::flushed(scope)))
}

/// Handler for GET /settings/:key
pub async fn get_setting_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<SettingResponse>> {
    check_key(&key)?;
    let response = blocking(move || {
        let engine = state.scoped(&query)?;
        let value = engine
            .get(&key)?
            .ok_or_else(|| SettingsError::SettingNotFound(key.clone()))?;
        Ok(SettingResponse::new(engine.scope_key(), key, value))
    })
    .await?;

    Ok(Json(response))
}

/// Handler for PUT /settings/:key
pub async fn put_setting_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<TenantQuery>,
    Json(req): Json<SetSettingRequest>,
) -> Result<Json<SettingResponse>> {
    check_key(&key)?;
    let response = blocking(move || {
        let engine = state.scoped(&query)?;

        match req.description.as_deref() {
            Some(description) => engine.set_with_description(&key, req.value, description)?,
            None => engine.set(&key, req.value)?,
        };

        let setting = engine.setting(&key)?.ok_or_else(|| {
            SettingsError::Storage(format!("setting '{}' missing after write", key))
        })?;
        let value = setting.value()?;
        Ok(SettingResponse::from_setting(engine.scope_key(), setting, value))
    })
    .await?;

    Ok(Json(response))
}

/// Handler for DELETE /settings/:key
pub async fn forget_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<DeleteResponse>> {
    check_key(&key)?;
    let response = blocking(move || {
        let engine = state.scoped(&query)?;
        engine.forget(&key)?;
        Ok(DeleteResponse::forgotten(engine.scope_key(), key))
    })
    .await?;

    Ok(Json(response))
}

/// Handler for POST /cache/clear
pub async fn clear_cache_handler(
    State(state): State<AppState>,
    Json(req): Json<ClearCacheRequest>,
) -> Result<Json<ClearCacheResponse>> {
    let target: CacheTarget = req.scope.parse()?;
    let response = blocking(move || {
        let cleared = state.engine.clear_cache(&target)?;
        Ok(ClearCacheResponse {
            target: target.to_string(),
            cleared,
        })
    })
    .await?;

    Ok(Json(response))
}

/// Handler for POST /defaults/install
pub async fn install_defaults_handler(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
    Json(req): Json<InstallDefaultsRequest>,
) -> Result<Json<InstallResponse>> {
    let response = blocking(move || {
        let engine = state.scoped(&query)?;
        let defaults = req.defaults.as_ref().unwrap_or(&*state.defaults);
        let report = engine.install_defaults(defaults, req.force)?;
        Ok(InstallResponse {
            scope: engine.scope_key(),
            report,
        })
    })
    .await?;

    Ok(Json(response))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.engine.cache();

    Json(StatsResponse::new(
        state.backend.stats(),
        cache.stats(),
        cache.is_enabled(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
