//! Settings Store Module
//!
//! Persistence abstraction over setting rows keyed by (tenant scope, key).
//!
//! # Backends
//! - `MemorySettingsStore` - process-local rows
//! - `SqliteSettingsStore` - relational table via rusqlite

mod memory;
mod sqlite;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::codec::TypeTag;
use crate::error::Result;
use crate::tenant::TenantScope;

pub use memory::MemorySettingsStore;
pub use sqlite::SqliteSettingsStore;

/// Decoded settings of one scope, ordered by key.
pub type SettingsMap = BTreeMap<String, Value>;

// == Setting ==
/// One persisted row; at most one exists per (scope, key).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Setting {
    /// Row identity, preserved across updates
    pub id: i64,
    pub key: String,
    /// Serialized value; `None` means the row exists without a value
    pub raw_value: Option<String>,
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    /// Metadata only
    pub description: Option<String>,
    pub tenant_type: Option<String>,
    pub tenant_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Setting {
    /// Decodes the raw value by the row's declared type.
    pub fn value(&self) -> Result<Value> {
        self.type_tag.decode(self.raw_value.as_deref())
    }

    /// Scope owning this row.
    pub fn scope(&self) -> TenantScope {
        match (&self.tenant_type, self.tenant_id) {
            (Some(model_type), Some(id)) => TenantScope::Tenant {
                model_type: model_type.clone(),
                id,
            },
            _ => TenantScope::Global,
        }
    }
}

// == Settings Store ==
/// CRUD over setting rows. Every operation names its scope explicitly.
///
/// Failures surface as `SettingsError::Storage`; no retries happen here.
pub trait SettingsStore: Send + Sync {
    /// Row for `key` in `scope`, if any.
    fn find(&self, scope: &TenantScope, key: &str) -> Result<Option<Setting>>;

    /// Creates or updates the single row for (scope, key).
    ///
    /// The type tag is re-inferred from `value` on every call. An update keeps
    /// the row identity; `description: None` keeps the existing description.
    fn upsert(
        &self,
        scope: &TenantScope,
        key: &str,
        value: &Value,
        description: Option<&str>,
    ) -> Result<Setting>;

    /// Removes the row if present. Returns whether a row was removed.
    fn delete(&self, scope: &TenantScope, key: &str) -> Result<bool>;

    /// All rows of a scope, ordered by key.
    fn list(&self, scope: &TenantScope) -> Result<Vec<Setting>>;

    /// Removes every row of a scope. Returns the number removed.
    fn delete_all(&self, scope: &TenantScope) -> Result<usize>;

    /// Every scope that currently owns at least one row.
    fn list_scopes(&self) -> Result<Vec<TenantScope>>;

    /// Decoded key -> value mapping of a scope.
    fn list_all(&self, scope: &TenantScope) -> Result<SettingsMap> {
        self.list(scope)?
            .into_iter()
            .map(|setting| Ok((setting.key.clone(), setting.value()?)))
            .collect()
    }
}

// == Row Helpers ==
/// Encodes a value for storage under its inferred tag.
pub(crate) fn encode_for_storage(value: &Value) -> (TypeTag, Option<String>) {
    let tag = TypeTag::infer(value);
    (tag, tag.encode(value))
}
