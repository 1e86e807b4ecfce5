//! Response DTOs for the settings API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheStats, LayerStatsSnapshot};
use crate::codec::TypeTag;
use crate::engine::InstallReport;
use crate::store::{Setting, SettingsMap};

/// Response body for `GET` and `PUT /settings/:key`.
#[derive(Debug, Clone, Serialize)]
pub struct SettingResponse {
    pub scope: String,
    pub key: String,
    pub value: Value,
    /// Stored type; present when the row was read back
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<TypeTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SettingResponse {
    pub fn new(scope: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            scope: scope.into(),
            key: key.into(),
            value,
            type_tag: None,
            description: None,
        }
    }

    /// Builds the response from a persisted row and its decoded value.
    pub fn from_setting(scope: impl Into<String>, setting: Setting, value: Value) -> Self {
        Self {
            scope: scope.into(),
            key: setting.key,
            value,
            type_tag: Some(setting.type_tag),
            description: setting.description,
        }
    }
}

/// Response body for `GET /settings`.
#[derive(Debug, Clone, Serialize)]
pub struct AllSettingsResponse {
    pub scope: String,
    pub settings: SettingsMap,
}

/// Response body for `DELETE /settings/:key` and `DELETE /settings`.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    pub scope: String,
    /// The forgotten key; absent for a flush
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl DeleteResponse {
    pub fn forgotten(scope: impl Into<String>, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Setting '{}' deleted successfully", key),
            scope: scope.into(),
            key: Some(key),
        }
    }

    pub fn flushed(scope: impl Into<String>) -> Self {
        let scope = scope.into();
        Self {
            message: format!("Settings of '{}' flushed successfully", scope),
            scope,
            key: None,
        }
    }
}

/// Response body for `POST /cache/clear`.
#[derive(Debug, Clone, Serialize)]
pub struct ClearCacheResponse {
    pub target: String,
    pub cleared: usize,
}

/// Response body for `POST /defaults/install`.
#[derive(Debug, Clone, Serialize)]
pub struct InstallResponse {
    pub scope: String,
    #[serde(flatten)]
    pub report: InstallReport,
}

/// Statistics of the in-memory cache backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for BackendStatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            total_entries: stats.total_entries,
        }
    }
}

/// Statistics of the two-tier cache layer.
#[derive(Debug, Clone, Serialize)]
pub struct LayerStatsResponse {
    pub enabled: bool,
    #[serde(flatten)]
    pub counters: LayerStatsSnapshot,
    pub hit_rate: f64,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub backend: BackendStatsResponse,
    pub layer: LayerStatsResponse,
}

impl StatsResponse {
    pub fn new(backend: CacheStats, layer: LayerStatsSnapshot, enabled: bool) -> Self {
        Self {
            backend: backend.into(),
            layer: LayerStatsResponse {
                enabled,
                hit_rate: layer.hit_rate(),
                counters: layer,
            },
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
