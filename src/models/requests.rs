//! Request DTOs for the settings API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::store::SettingsMap;

/// Maximum setting key length in characters.
pub const MAX_KEY_LENGTH: usize = 255;

/// Request body for `PUT /settings/:key`.
///
/// A missing or `null` value stores an empty setting.
#[derive(Debug, Clone, Deserialize)]
pub struct SetSettingRequest {
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub description: Option<String>,
}

/// Query parameters selecting the tenant scope of a request.
///
/// Both absent means the global scope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantQuery {
    pub tenant_type: Option<String>,
    pub tenant_id: Option<i64>,
}

/// Request body for `POST /cache/clear`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClearCacheRequest {
    /// `all`, `global` or `{type}:{id}`
    #[serde(default = "all_scopes")]
    pub scope: String,
}

fn all_scopes() -> String {
    "all".to_string()
}

/// Request body for `POST /defaults/install`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstallDefaultsRequest {
    #[serde(default)]
    pub force: bool,
    /// Overrides the defaults loaded at startup
    #[serde(default)]
    pub defaults: Option<SettingsMap>,
}

/// Validates a setting key taken from the request path.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.trim().is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.chars().count() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let req: SetSettingRequest =
            serde_json::from_str(r#"{"value": ["a", "b"], "description": "tags"}"#).unwrap();
        assert_eq!(req.value, json!(["a", "b"]));
        assert_eq!(req.description.as_deref(), Some("tags"));
    }

    #[test]
    fn test_set_request_without_value() {
        let req: SetSettingRequest = serde_json::from_str("{}").unwrap();
        assert!(req.value.is_null());
        assert!(req.description.is_none());
    }

    #[test]
    fn test_clear_cache_defaults_to_all() {
        let req: ClearCacheRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.scope, "all");
    }

    #[test]
    fn test_install_request_defaults() {
        let req: InstallDefaultsRequest = serde_json::from_str("{}").unwrap();
        assert!(!req.force);
        assert!(req.defaults.is_none());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("").is_some());
        assert!(validate_key("   ").is_some());
        assert!(validate_key(&"k".repeat(MAX_KEY_LENGTH + 1)).is_some());
        assert!(validate_key("mail.from_address").is_none());
    }
}
