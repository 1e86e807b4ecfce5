//! Settings Engine Module
//!
//! Public facade tying tenancy policy, persistence and caching together.
//!
//! An engine is either unbound (global scope) or bound to one tenant.
//! Binding returns a new engine and never changes the receiver, so a shared
//! unbound engine can be handed to concurrent callers safely.

mod admin;


use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::CacheLayer;
use crate::error::{Result, SettingsError};
use crate::store::{Setting, SettingsMap, SettingsStore};
use crate::tenant::{Tenant, TenantLookup, TenantPolicy, TenantScope};

pub use admin::{CacheTarget, InstallReport};

// == Settings Engine ==
#[derive(Clone)]
pub struct SettingsEngine {
    policy: Arc<TenantPolicy>,
    store: Arc<dyn SettingsStore>,
    cache: Arc<CacheLayer>,
    lookup: Arc<dyn TenantLookup>,
    tenant: Option<Tenant>,
}

impl SettingsEngine {
    // == Constructor ==
    /// Creates an unbound engine operating on the global scope.
    pub fn new(
        policy: TenantPolicy,
        store: Arc<dyn SettingsStore>,
        cache: Arc<CacheLayer>,
        lookup: Arc<dyn TenantLookup>,
    ) -> Self {
        Self {
            policy: Arc::new(policy),
            store,
            cache,
            lookup,
            tenant: None,
        }
    }

    // == Binding ==
    /// Returns an engine bound to `tenant` after validating it.
    pub fn bind_tenant(&self, tenant: &Tenant) -> Result<Self> {
        self.policy.validate(Some(tenant))?;
        debug!(tenant = %tenant, "Bound settings engine to tenant");
        Ok(Self {
            tenant: Some(tenant.clone()),
            ..self.clone()
        })
    }

    /// Looks the tenant up by id and binds to it.
    ///
    /// In strict mode the configured model type wins over `model_type`.
    pub fn bind_tenant_by_id(&self, id: i64, model_type: Option<&str>) -> Result<Self> {
        let model_type = self.policy.resolve_model_type_for_lookup(model_type)?;
        let tenant = self
            .lookup
            .find_by_id(&model_type, id)?
            .ok_or_else(|| SettingsError::TenantNotFound {
                model_type: model_type.clone(),
                id,
            })?;
        self.bind_tenant(&tenant)
    }

    /// Unbound engine sharing the same collaborators.
    pub fn global(&self) -> Self {
        Self {
            tenant: None,
            ..self.clone()
        }
    }

    pub fn tenant(&self) -> Option<&Tenant> {
        self.tenant.as_ref()
    }

    pub fn scope(&self) -> TenantScope {
        TenantScope::of(self.tenant.as_ref())
    }

    /// String form of the scope, `global` or `{type}:{id}`.
    pub fn scope_key(&self) -> String {
        self.policy.scope_key(self.tenant.as_ref())
    }

    pub fn cache(&self) -> &Arc<CacheLayer> {
        &self.cache
    }

    // == Reads ==
    /// Decoded value of `key`, or `None` when unset or stored as null.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let settings = self.load(&self.scope())?;
        Ok(settings.get(key).filter(|v| !v.is_null()).cloned())
    }

    /// Value of `key`, falling back to `default`.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Result<Value> {
        Ok(self.get(key)?.unwrap_or_else(|| default.into()))
    }

    /// Value of `key` deserialized into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)?
            .map(|value| {
                serde_json::from_value(value).map_err(|e| {
                    SettingsError::Codec(format!("setting '{}' has an unexpected shape: {}", key, e))
                })
            })
            .transpose()
    }

    pub fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Every decoded setting of the scope. Keys stored as null are left out.
    pub fn all(&self) -> Result<SettingsMap> {
        let settings = self.load(&self.scope())?;
        Ok(settings
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    /// Persisted row of `key`, including its metadata.
    pub fn setting(&self, key: &str) -> Result<Option<Setting>> {
        self.store.find(&self.scope(), key)
    }

    // == Writes ==
    /// Stores `value` under `key`, re-inferring its type.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<&Self> {
        self.write(key, value.into(), None)
    }

    pub fn set_with_description(
        &self,
        key: &str,
        value: impl Into<Value>,
        description: &str,
    ) -> Result<&Self> {
        self.write(key, value.into(), Some(description))
    }

    /// Removes `key`; absent keys are not an error.
    pub fn forget(&self, key: &str) -> Result<&Self> {
        let scope = self.scope();
        let removed = self.store.delete(&scope, key)?;
        debug!(scope = %scope, key, removed, "Forgot setting");

        self.refresh_cached(&scope, |settings| {
            settings.remove(key);
        });
        Ok(self)
    }

    /// Removes every setting of the scope.
    pub fn flush(&self) -> Result<&Self> {
        let scope = self.scope();
        let removed = self.store.delete_all(&scope)?;
        self.cache.invalidate(&scope);
        info!(scope = %scope, removed, "Flushed settings");
        Ok(self)
    }

    fn write(&self, key: &str, value: Value, description: Option<&str>) -> Result<&Self> {
        let scope = self.scope();
        let setting = self.store.upsert(&scope, key, &value, description)?;
        debug!(scope = %scope, key, type_tag = %setting.type_tag, "Stored setting");

        self.refresh_cached(&scope, |settings| {
            settings.insert(key.to_string(), value);
        });
        Ok(self)
    }

    fn load(&self, scope: &TenantScope) -> Result<Arc<SettingsMap>> {
        self.cache
            .read_through(scope, || self.store.list_all(scope))
    }

    /// Write-through refresh of a scope's cached snapshot.
    ///
    /// Without a current snapshot the scope is invalidated instead, so a
    /// partial mapping is never cached.
    fn refresh_cached<F>(&self, scope: &TenantScope, edit: F)
    where
        F: FnOnce(&mut SettingsMap),
    {
        match self.cache.snapshot(scope) {
            Some(current) => {
                let mut next = current.as_ref().clone();
                edit(&mut next);
                self.cache.put(scope, next);
            }
            None => self.cache.invalidate(scope),
        }
    }
}

impl fmt::Debug for SettingsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsEngine")
            .field("scope", &self.scope_key())
            .field("cache", &self.cache)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::MemoryCacheBackend;
    use crate::codec::TypeTag;
    use crate::store::MemorySettingsStore;
    use crate::tenant::{TenancyConfig, TenantRegistry};
    use serde_json::json;

    pub(crate) fn engine_with(config: TenancyConfig) -> SettingsEngine {
        let cache = CacheLayer::new(Arc::new(MemoryCacheBackend::default()), "test", 3600);
        let registry = TenantRegistry::new()
            .register_ids("Company", 1..=10)
            .register_ids("User", 1..=10);
        SettingsEngine::new(
            TenantPolicy::new(config),
            Arc::new(MemorySettingsStore::new()),
            Arc::new(cache),
            Arc::new(registry),
        )
    }

    pub(crate) fn engine() -> SettingsEngine {
        engine_with(TenancyConfig::polymorphic(Vec::<String>::new()))
    }

    #[test]
    fn test_get_missing_returns_none_and_default() {
        let engine = engine();
        assert_eq!(engine.get("missing").unwrap(), None);
        assert_eq!(engine.get_or("missing", "fallback").unwrap(), json!("fallback"));
        assert!(!engine.has("missing").unwrap());
    }

    #[test]
    fn test_set_then_get_chained() {
        let engine = engine();
        engine.set("a", 1).unwrap().set("b", true).unwrap();

        assert_eq!(engine.get("a").unwrap(), Some(json!(1)));
        assert_eq!(engine.get("b").unwrap(), Some(json!(true)));
        assert_eq!(engine.all().unwrap().len(), 2);
    }

    #[test]
    fn test_bind_returns_new_instance() {
        let global = engine();
        let bound = global.bind_tenant(&Tenant::new("Company", 1)).unwrap();

        assert!(global.tenant().is_none());
        assert_eq!(bound.tenant(), Some(&Tenant::new("Company", 1)));
        assert_eq!(bound.scope_key(), "Company:1");
        assert!(bound.global().tenant().is_none());
    }

    #[test]
    fn test_set_after_cached_read_updates_snapshot() {
        let engine = engine();
        engine.set("lang", "en").unwrap();
        assert_eq!(engine.get("lang").unwrap(), Some(json!("en")));

        engine.set("lang", "de").unwrap();
        assert_eq!(engine.get("lang").unwrap(), Some(json!("de")));
        assert_eq!(engine.cache().stats().loads, 1);
    }

    #[test]
    fn test_forget_removes_from_snapshot() {
        let engine = engine();
        engine.set("theme", "dark").unwrap();
        engine.all().unwrap();

        engine.forget("theme").unwrap();
        engine.forget("theme").unwrap();

        assert!(!engine.has("theme").unwrap());
        assert!(engine.setting("theme").unwrap().is_none());
    }

    #[test]
    fn test_null_value_reads_as_absent() {
        let engine = engine();
        engine.set("cleared", Value::Null).unwrap();

        assert!(engine.setting("cleared").unwrap().is_some());
        assert_eq!(engine.get("cleared").unwrap(), None);
        assert_eq!(engine.get_or("cleared", 5).unwrap(), json!(5));
    }

    #[test]
    fn test_tenant_settings_binds_engine() {
        let global = engine();
        let tenant = Tenant::new("User", 4);
        tenant.settings(&global).unwrap().set("lang", "nl").unwrap();

        assert_eq!(tenant.settings(&global).unwrap().get("lang").unwrap(), Some(json!("nl")));
        assert_eq!(global.get("lang").unwrap(), None);

        let strict = engine_with(TenancyConfig::strict("Company"));
        assert!(tenant.settings(&strict).is_err());
    }

    #[test]
    fn test_bind_rejects_blank_model_type() {
        let result = engine().bind_tenant(&Tenant::new("", 0));
        assert!(matches!(result, Err(SettingsError::TenantValidation { .. })));
    }

    #[test]
    fn test_all_omits_null_values() {
        let engine = engine();
        engine.set("kept", 1).unwrap();
        engine.all().unwrap();
        engine.set("cleared", Value::Null).unwrap();

        let cached = engine.all().unwrap();
        assert!(!cached.contains_key("cleared"));
        assert_eq!(cached.len(), 1);
        assert!(!engine.has("cleared").unwrap());

        engine.cache().set_enabled(false);
        let loaded = engine.all().unwrap();
        assert_eq!(loaded, cached);
    }

    #[test]
    fn test_type_switches_on_set() {
        let engine = engine();
        engine.set("limit", 10).unwrap();
        engine.set("limit", "unlimited").unwrap();

        let row = engine.setting("limit").unwrap().unwrap();
        assert_eq!(row.type_tag, TypeTag::String);
        assert_eq!(engine.get("limit").unwrap(), Some(json!("unlimited")));
    }

    #[test]
    fn test_set_with_description() {
        let engine = engine();
        engine
            .set_with_description("max_users", 50, "Seat limit")
            .unwrap();

        let row = engine.setting("max_users").unwrap().unwrap();
        assert_eq!(row.description.as_deref(), Some("Seat limit"));
    }

    #[test]
    fn test_get_as_typed() {
        let engine = engine();
        engine.set("tags", vec!["a", "b"]).unwrap();
        engine.set("limit", 3).unwrap();

        let tags: Option<Vec<String>> = engine.get_as("tags").unwrap();
        assert_eq!(tags, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(engine.get_as::<u32>("limit").unwrap(), Some(3));
        assert!(matches!(
            engine.get_as::<bool>("tags"),
            Err(SettingsError::Codec(_))
        ));
    }

    #[test]
    fn test_bind_tenant_by_id_strict_ignores_explicit_type() {
        let engine = engine_with(TenancyConfig::strict("Company"));
        let bound = engine.bind_tenant_by_id(3, Some("User")).unwrap();
        assert_eq!(bound.tenant(), Some(&Tenant::new("Company", 3)));
    }

    #[test]
    fn test_bind_tenant_by_id_missing() {
        let err = engine().bind_tenant_by_id(999, Some("Company")).unwrap_err();
        assert!(matches!(err, SettingsError::TenantNotFound { id: 999, .. }));
        assert_eq!(err.to_string(), "Tenant not found: Company#999");
    }

    #[test]
    fn test_bind_tenant_by_id_polymorphic_requires_type() {
        let err = engine().bind_tenant_by_id(1, None).unwrap_err();
        assert!(matches!(err, SettingsError::Configuration(_)));
    }

    #[test]
    fn test_unconfigured_mode_is_fatal() {
        let config = TenancyConfig {
            validation_enabled: true,
            mode: None,
            strict_model_type: None,
            allowed_model_types: Vec::new(),
        };
        let engine = engine_with(config);

        assert!(matches!(
            engine.bind_tenant(&Tenant::new("Company", 1)),
            Err(SettingsError::Configuration(_))
        ));
        assert!(matches!(
            engine.bind_tenant_by_id(1, Some("Company")),
            Err(SettingsError::Configuration(_))
        ));
    }
}
