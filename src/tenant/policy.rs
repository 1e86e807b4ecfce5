//! Tenancy Policy
//!
//! Validates tenants against the configured tenancy mode and resolves the
//! model type to use when a tenant is looked up by id alone.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SettingsError};
use crate::tenant::{Tenant, TenantScope};

// == Tenancy Mode ==
/// How many tenant model types a deployment accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenancyMode {
    /// Exactly one tenant model type
    Strict,
    /// Several tenant model types, optionally restricted by an allow-list
    Polymorphic,
}

impl TenancyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenancyMode::Strict => "strict",
            TenancyMode::Polymorphic => "polymorphic",
        }
    }
}

impl FromStr for TenancyMode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(TenancyMode::Strict),
            "polymorphic" => Ok(TenancyMode::Polymorphic),
            other => Err(SettingsError::Configuration(format!(
                "unknown tenancy mode '{}'",
                other
            ))),
        }
    }
}

// == Tenancy Config ==
/// Tenancy options as loaded from configuration.
///
/// `mode` is `None` when the configured mode is unset or unrecognised.
#[derive(Debug, Clone)]
pub struct TenancyConfig {
    pub validation_enabled: bool,
    pub mode: Option<TenancyMode>,
    pub strict_model_type: Option<String>,
    pub allowed_model_types: Vec<String>,
}

impl TenancyConfig {
    /// Strict mode bound to a single model type.
    pub fn strict(model_type: impl Into<String>) -> Self {
        Self {
            validation_enabled: true,
            mode: Some(TenancyMode::Strict),
            strict_model_type: Some(model_type.into()),
            allowed_model_types: Vec::new(),
        }
    }

    /// Polymorphic mode; an empty allow-list accepts any model type.
    pub fn polymorphic<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            validation_enabled: true,
            mode: Some(TenancyMode::Polymorphic),
            strict_model_type: None,
            allowed_model_types: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Same settings with validation switched off.
    pub fn without_validation(mut self) -> Self {
        self.validation_enabled = false;
        self
    }
}

// == Tenant Policy ==
/// Decides which tenants may own settings.
#[derive(Debug, Clone)]
pub struct TenantPolicy {
    config: TenancyConfig,
}

impl TenantPolicy {
    pub fn new(config: TenancyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TenancyConfig {
        &self.config
    }

    // == Resolve Model Type ==
    /// Model type to use when resolving a tenant purely by id.
    ///
    /// Strict mode ignores `explicit_type` in favour of the configured type.
    pub fn resolve_model_type_for_lookup(&self, explicit_type: Option<&str>) -> Result<String> {
        if !self.config.validation_enabled {
            return explicit_type
                .map(str::to_string)
                .ok_or_else(missing_model_type);
        }

        match self.config.mode {
            Some(TenancyMode::Strict) => self.strict_model_type().map(str::to_string),
            Some(TenancyMode::Polymorphic) => {
                let model_type = explicit_type.ok_or_else(missing_model_type)?;
                self.check_allowed(&Tenant::new(model_type, 0))?;
                Ok(model_type.to_string())
            }
            None => Err(missing_configuration("tenancy_mode")),
        }
    }

    // == Validate ==
    /// Checks a candidate tenant against the tenancy mode.
    ///
    /// No-op when validation is disabled or the tenant is `None`.
    pub fn validate(&self, tenant: Option<&Tenant>) -> Result<()> {
        let tenant = match tenant {
            Some(t) => t,
            None => return Ok(()),
        };
        // A blank type would share the global scope's identity in storage.
        if tenant.model_type.trim().is_empty() {
            return Err(SettingsError::blank_model_type(tenant));
        }
        if !self.config.validation_enabled {
            return Ok(());
        }

        match self.config.mode {
            Some(TenancyMode::Strict) => {
                let expected = self.strict_model_type()?;
                if tenant.model_type != expected {
                    debug!(tenant = %tenant, expected, "Rejected tenant in strict mode");
                    return Err(SettingsError::strict_mismatch(tenant, expected));
                }
                Ok(())
            }
            Some(TenancyMode::Polymorphic) => self.check_allowed(tenant),
            None => Err(missing_configuration("tenancy_mode")),
        }
    }

    /// Checks that the configured mode can validate tenants at all.
    pub fn check_config(&self) -> Result<()> {
        match self.config.mode {
            Some(TenancyMode::Strict) => self.strict_model_type().map(|_| ()),
            Some(TenancyMode::Polymorphic) => Ok(()),
            None => Err(missing_configuration("tenancy_mode")),
        }
    }

    // == Scope Key ==
    /// Stable identity key of the tenant's scope.
    pub fn scope_key(&self, tenant: Option<&Tenant>) -> String {
        TenantScope::of(tenant).key()
    }

    fn strict_model_type(&self) -> Result<&str> {
        self.config
            .strict_model_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| missing_configuration("strict_tenant_model"))
    }

    fn check_allowed(&self, tenant: &Tenant) -> Result<()> {
        let allowed = &self.config.allowed_model_types;
        if !allowed.is_empty() && !allowed.iter().any(|t| *t == tenant.model_type) {
            debug!(tenant = %tenant, "Rejected tenant outside the allow-list");
            return Err(SettingsError::not_allowed(tenant, allowed));
        }
        Ok(())
    }
}

fn missing_configuration(key: &str) -> SettingsError {
    SettingsError::Configuration(format!("tenant configuration missing: {}", key))
}

fn missing_model_type() -> SettingsError {
    SettingsError::Configuration("model type required in polymorphic mode".to_string())
}
