//! Error types for the settings engine
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::tenant::Tenant;

// == Settings Error Enum ==
/// Unified error type for the settings engine.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Tenancy mode unset or unknown, or strict mode without its model type
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Tenant failed the strict type or allow-list check
    #[error("{message}")]
    TenantValidation {
        message: String,
        tenant: Tenant,
        allowed: Vec<String>,
    },

    /// No tenant entity exists for the given type and id
    #[error("Tenant not found: {model_type}#{id}")]
    TenantNotFound { model_type: String, id: i64 },

    /// Key has no value in the requested scope
    #[error("Setting not found: {0}")]
    SettingNotFound(String),

    /// Persistence collaborator failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored raw value cannot be decoded as its declared type
    #[error("Codec error: {0}")]
    Codec(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl SettingsError {
    // == Constructors ==
    /// Rejection of a tenant whose type differs from the strict model type.
    pub fn strict_mismatch(tenant: &Tenant, expected: &str) -> Self {
        Self::TenantValidation {
            message: format!(
                "Invalid tenant type. Expected instance of [{}], got [{}].",
                expected, tenant.model_type
            ),
            tenant: tenant.clone(),
            allowed: vec![expected.to_string()],
        }
    }

    /// Rejection of a tenant without a model type name.
    pub fn blank_model_type(tenant: &Tenant) -> Self {
        Self::TenantValidation {
            message: "Invalid tenant type. Model type must not be empty.".to_string(),
            tenant: tenant.clone(),
            allowed: Vec::new(),
        }
    }

    /// Rejection of a tenant whose type is absent from the allow-list.
    pub fn not_allowed(tenant: &Tenant, allowed: &[String]) -> Self {
        Self::TenantValidation {
            message: format!(
                "Invalid tenant type. Expected one of [{}], got [{}].",
                allowed.join(", "),
                tenant.model_type
            ),
            tenant: tenant.clone(),
            allowed: allowed.to_vec(),
        }
    }

    /// The rejected tenant, for validation failures.
    pub fn rejected_tenant(&self) -> Option<&Tenant> {
        match self {
            Self::TenantValidation { tenant, .. } => Some(tenant),
            _ => None,
        }
    }

    /// The allowed tenant types, for validation failures.
    pub fn allowed_types(&self) -> &[String] {
        match self {
            Self::TenantValidation { allowed, .. } => allowed,
            _ => &[],
        }
    }
}

impl From<rusqlite::Error> for SettingsError {
    fn from(err: rusqlite::Error) -> Self {
        SettingsError::Storage(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SettingsError {
    fn from(err: tokio::task::JoinError) -> Self {
        SettingsError::Storage(format!("settings task failed: {}", err))
    }
}

// == Cache Backend Error ==
/// Failure of the external cache backend.
///
/// Never surfaces to engine callers; the cache layer logs it and degrades
/// to the persistent store.
#[derive(Error, Debug)]
pub enum CacheBackendError {
    /// Backend could not be reached or refused the operation
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    /// Cached payload could not be (de)serialized
    #[error("Cache payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// Operation not offered by this backend
    #[error("Unsupported cache operation: {0}")]
    Unsupported(&'static str),
}

// == IntoResponse Implementation ==
impl IntoResponse for SettingsError {
    fn into_response(self) -> Response {
        let status = match &self {
            SettingsError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SettingsError::TenantValidation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            SettingsError::TenantNotFound { .. } => StatusCode::NOT_FOUND,
            SettingsError::SettingNotFound(_) => StatusCode::NOT_FOUND,
            SettingsError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SettingsError::Codec(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SettingsError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the settings engine.
pub type Result<T> = std::result::Result<T, SettingsError>;
