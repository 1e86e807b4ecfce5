//! In-Memory Settings Store
//!
//! Process-local rows grouped by scope. Used for tests and ephemeral runs.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::Result;
use crate::store::{encode_for_storage, Setting, SettingsStore};
use crate::tenant::TenantScope;

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    by_scope: HashMap<TenantScope, BTreeMap<String, Setting>>,
}

// == Memory Settings Store ==
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    rows: RwLock<Rows>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows across all scopes.
    pub fn len(&self) -> usize {
        self.rows.read().by_scope.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SettingsStore for MemorySettingsStore {
    fn find(&self, scope: &TenantScope, key: &str) -> Result<Option<Setting>> {
        let rows = self.rows.read();
        Ok(rows.by_scope.get(scope).and_then(|s| s.get(key)).cloned())
    }

    fn upsert(
        &self,
        scope: &TenantScope,
        key: &str,
        value: &Value,
        description: Option<&str>,
    ) -> Result<Setting> {
        let (type_tag, raw_value) = encode_for_storage(value);
        let now = Utc::now();

        let mut guard = self.rows.write();
        let rows = &mut *guard;
        let next_id = &mut rows.next_id;

        let scoped = rows.by_scope.entry(scope.clone()).or_default();
        let setting = scoped
            .entry(key.to_string())
            .and_modify(|existing| {
                existing.raw_value = raw_value.clone();
                existing.type_tag = type_tag;
                if let Some(d) = description {
                    existing.description = Some(d.to_string());
                }
                existing.updated_at = now;
            })
            .or_insert_with(|| {
                *next_id += 1;
                Setting {
                    id: *next_id,
                    key: key.to_string(),
                    raw_value: raw_value.clone(),
                    type_tag,
                    description: description.map(str::to_string),
                    tenant_type: scope.model_type().map(str::to_string),
                    tenant_id: scope.tenant_id(),
                    created_at: now,
                    updated_at: now,
                }
            });

        Ok(setting.clone())
    }

    fn delete(&self, scope: &TenantScope, key: &str) -> Result<bool> {
        let mut rows = self.rows.write();
        let removed = match rows.by_scope.get_mut(scope) {
            Some(scoped) => scoped.remove(key).is_some(),
            None => false,
        };
        if rows.by_scope.get(scope).is_some_and(BTreeMap::is_empty) {
            rows.by_scope.remove(scope);
        }
        Ok(removed)
    }

    fn list(&self, scope: &TenantScope) -> Result<Vec<Setting>> {
        let rows = self.rows.read();
        Ok(rows
            .by_scope
            .get(scope)
            .map(|scoped| scoped.values().cloned().collect())
            .unwrap_or_default())
    }

    fn delete_all(&self, scope: &TenantScope) -> Result<usize> {
        let mut rows = self.rows.write();
        Ok(rows.by_scope.remove(scope).map(|s| s.len()).unwrap_or(0))
    }

    fn list_scopes(&self) -> Result<Vec<TenantScope>> {
        let rows = self.rows.read();
        Ok(rows.by_scope.keys().cloned().collect())
    }
}
