//! Configuration Module
//!
//! Handles loading and managing engine and server configuration from
//! environment variables.

use std::env;
use std::path::PathBuf;

use crate::cache::{DEFAULT_PREFIX, DEFAULT_TTL_SECONDS};
use crate::tenant::{TenancyConfig, TenancyMode};

// == Store Kind ==
/// Persistence backend selected with `SETTINGS_STORE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Memory,
}

impl StoreKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(StoreKind::Sqlite),
            "memory" => Some(StoreKind::Memory),
            _ => None,
        }
    }
}

/// Settings engine and server configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether reads go through the cache layer
    pub cache_enabled: bool,
    /// Cache backend name; only `memory` is built in
    pub cache_store: String,
    /// Namespace of cache keys
    pub cache_prefix: String,
    /// Lifetime of cached scopes in seconds, 0 = until invalidated
    pub cache_ttl_seconds: u64,
    /// Capacity of the in-memory cache backend
    pub cache_max_entries: usize,
    /// Raw tenancy mode; `None` when unset
    pub tenancy_mode: Option<String>,
    pub strict_tenant_model_type: Option<String>,
    pub allowed_tenant_model_types: Vec<String>,
    pub validation_enabled: bool,
    pub table_name: String,
    /// Tenant columns are `{prefix}_type` and `{prefix}_id`
    pub tenant_column_prefix: String,
    pub store: StoreKind,
    /// SQLite database path
    pub database_path: PathBuf,
    /// Optional JSON object of defaults installed at startup
    pub defaults_file: Option<PathBuf>,
    /// HTTP server port
    pub server_port: u16,
    /// Background cache sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SETTINGS_CACHE_ENABLED` - Cache reads (default: true)
    /// - `SETTINGS_CACHE_STORE` - Cache backend (default: memory)
    /// - `SETTINGS_CACHE_PREFIX` - Cache key prefix (default: tenant_settings)
    /// - `SETTINGS_CACHE_TTL` - Cache TTL in seconds (default: 3600)
    /// - `SETTINGS_CACHE_MAX_ENTRIES` - Cache backend capacity (default: 1000)
    /// - `SETTINGS_TENANCY_MODE` - strict | polymorphic (default: strict)
    /// - `SETTINGS_STRICT_TENANT_MODEL` - Model type accepted in strict mode
    /// - `SETTINGS_ALLOWED_TENANT_MODELS` - Comma-separated allow-list
    /// - `SETTINGS_VALIDATION_ENABLED` - Tenant validation (default: true)
    /// - `SETTINGS_TABLE` - Table name (default: settings)
    /// - `SETTINGS_TENANT_COLUMN` - Tenant column prefix (default: tenantable)
    /// - `SETTINGS_STORE` - sqlite | memory (default: sqlite)
    /// - `SETTINGS_DATABASE` - SQLite path (default: settings.db)
    /// - `SETTINGS_DEFAULTS_FILE` - Defaults JSON file (default: none)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cache sweep frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            cache_enabled: env_bool("SETTINGS_CACHE_ENABLED").unwrap_or(defaults.cache_enabled),
            cache_store: env_string("SETTINGS_CACHE_STORE").unwrap_or(defaults.cache_store),
            cache_prefix: env_string("SETTINGS_CACHE_PREFIX").unwrap_or(defaults.cache_prefix),
            cache_ttl_seconds: env::var("SETTINGS_CACHE_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_ttl_seconds),
            cache_max_entries: env::var("SETTINGS_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_max_entries),
            tenancy_mode: env_string("SETTINGS_TENANCY_MODE").or(defaults.tenancy_mode),
            strict_tenant_model_type: env_string("SETTINGS_STRICT_TENANT_MODEL"),
            allowed_tenant_model_types: env::var("SETTINGS_ALLOWED_TENANT_MODELS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            validation_enabled: env_bool("SETTINGS_VALIDATION_ENABLED")
                .unwrap_or(defaults.validation_enabled),
            table_name: env_string("SETTINGS_TABLE").unwrap_or(defaults.table_name),
            tenant_column_prefix: env_string("SETTINGS_TENANT_COLUMN")
                .unwrap_or(defaults.tenant_column_prefix),
            store: env::var("SETTINGS_STORE")
                .ok()
                .and_then(|v| StoreKind::parse(&v))
                .unwrap_or(defaults.store),
            database_path: env_string("SETTINGS_DATABASE")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            defaults_file: env_string("SETTINGS_DEFAULTS_FILE").map(PathBuf::from),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Tenancy options for `TenantPolicy`. An unknown mode maps to `None`.
    pub fn tenancy_config(&self) -> TenancyConfig {
        TenancyConfig {
            validation_enabled: self.validation_enabled,
            mode: self
                .tenancy_mode
                .as_deref()
                .and_then(|mode| mode.parse::<TenancyMode>().ok()),
            strict_model_type: self.strict_tenant_model_type.clone(),
            allowed_model_types: self.allowed_tenant_model_types.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_store: "memory".to_string(),
            cache_prefix: DEFAULT_PREFIX.to_string(),
            cache_ttl_seconds: DEFAULT_TTL_SECONDS,
            cache_max_entries: 1000,
            tenancy_mode: Some(TenancyMode::Strict.as_str().to_string()),
            strict_tenant_model_type: None,
            allowed_tenant_model_types: Vec::new(),
            validation_enabled: true,
            table_name: "settings".to_string(),
            tenant_column_prefix: "tenantable".to_string(),
            store: StoreKind::Sqlite,
            database_path: PathBuf::from("settings.db"),
            defaults_file: None,
            server_port: 3000,
            cleanup_interval: 60,
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
    env_string(name).and_then(|v| match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
