//! Tenant Module
//!
//! Tenant descriptors, scope identity, tenancy policy and the model lookup
//! registry used to resolve tenants by id.

mod lookup;
mod policy;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::SettingsEngine;
use crate::error::{Result, SettingsError};

pub use lookup::{OpenLookup, TenantLookup, TenantRegistry};
pub use policy::{TenancyConfig, TenancyMode, TenantPolicy};

// == Tenant ==
/// An entity owning its own settings namespace, identified by model type and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tenant {
    /// Model type name (e.g. `Company`)
    pub model_type: String,
    /// Primary key of the entity
    pub id: i64,
}

impl Tenant {
    pub fn new(model_type: impl Into<String>, id: i64) -> Self {
        Self {
            model_type: model_type.into(),
            id,
        }
    }

    /// Settings of this tenant through `engine`.
    pub fn settings(&self, engine: &SettingsEngine) -> Result<SettingsEngine> {
        engine.bind_tenant(self)
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.model_type, self.id)
    }
}

// == Tenant Scope ==
/// Isolation partition for settings: global, or one tenant's namespace.
///
/// Two tenants with the same type and id denote the same scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TenantScope {
    Global,
    Tenant { model_type: String, id: i64 },
}

impl TenantScope {
    /// Scope of an optional tenant; `None` is the global scope.
    pub fn of(tenant: Option<&Tenant>) -> Self {
        match tenant {
            None => TenantScope::Global,
            Some(t) => TenantScope::Tenant {
                model_type: t.model_type.clone(),
                id: t.id,
            },
        }
    }

    /// Identity key used to partition caches: `global` or `{type}:{id}`.
    pub fn key(&self) -> String {
        self.to_string()
    }

    pub fn is_global(&self) -> bool {
        matches!(self, TenantScope::Global)
    }

    /// Owning model type column value, `None` for global.
    pub fn model_type(&self) -> Option<&str> {
        match self {
            TenantScope::Global => None,
            TenantScope::Tenant { model_type, .. } => Some(model_type),
        }
    }

    /// Owning id column value, `None` for global.
    pub fn tenant_id(&self) -> Option<i64> {
        match self {
            TenantScope::Global => None,
            TenantScope::Tenant { id, .. } => Some(*id),
        }
    }
}

impl From<&Tenant> for TenantScope {
    fn from(tenant: &Tenant) -> Self {
        TenantScope::of(Some(tenant))
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantScope::Global => f.write_str("global"),
            TenantScope::Tenant { model_type, id } => write!(f, "{}:{}", model_type, id),
        }
    }
}

impl FromStr for TenantScope {
    type Err = SettingsError;

    /// Parses `global` or `{type}:{id}`; the id is split off the last colon
    /// so namespaced type names such as `app::Company:3` are accepted.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "global" {
            return Ok(TenantScope::Global);
        }

        let invalid = || {
            SettingsError::InvalidRequest(format!(
                "Invalid tenant scope '{}'. Use: global or ModelType:ID (e.g. Company:1)",
                s
            ))
        };

        let (model_type, id) = s.rsplit_once(':').ok_or_else(invalid)?;
        let id: i64 = id.parse().map_err(|_| invalid())?;
        if model_type.is_empty() {
            return Err(invalid());
        }

        Ok(TenantScope::Tenant {
            model_type: model_type.to_string(),
            id,
        })
    }
}
