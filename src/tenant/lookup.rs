//! Tenant Lookup Registry
//!
//! Host applications register one lookup function per tenant model type at
//! startup; the engine resolves tenants by id through this table.

use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::tenant::Tenant;

type LookupFn = Box<dyn Fn(i64) -> Result<Option<Tenant>> + Send + Sync>;

// == Tenant Lookup ==
/// Model-lookup collaborator: finds a tenant entity by model type and id.
pub trait TenantLookup: Send + Sync {
    fn find_by_id(&self, model_type: &str, id: i64) -> Result<Option<Tenant>>;
}

// == Tenant Registry ==
/// Table of per-type lookup functions.
#[derive(Default)]
pub struct TenantRegistry {
    lookups: HashMap<String, LookupFn>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the lookup for a model type, replacing any previous one.
    pub fn register<F>(mut self, model_type: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(i64) -> Result<Option<Tenant>> + Send + Sync + 'static,
    {
        self.lookups.insert(model_type.into(), Box::new(lookup));
        self
    }

    /// Registers a model type whose entities are known up front by id.
    pub fn register_ids<I>(self, model_type: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        let model_type = model_type.into();
        let ids: Vec<i64> = ids.into_iter().collect();
        let name = model_type.clone();
        self.register(model_type, move |id| {
            Ok(ids.contains(&id).then(|| Tenant::new(name.clone(), id)))
        })
    }

    /// Registered model types, sorted.
    pub fn model_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.lookups.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl TenantLookup for TenantRegistry {
    /// Unregistered model types resolve to no tenant.
    fn find_by_id(&self, model_type: &str, id: i64) -> Result<Option<Tenant>> {
        match self.lookups.get(model_type) {
            Some(lookup) => lookup(id),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for TenantRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantRegistry")
            .field("model_types", &self.model_types())
            .finish()
    }
}

// == Open Lookup ==
/// Resolves any model type with a positive id.
///
/// For deployments whose tenant entities live in another system and are
/// identified only by type and id.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenLookup;

impl TenantLookup for OpenLookup {
    fn find_by_id(&self, model_type: &str, id: i64) -> Result<Option<Tenant>> {
        Ok((id > 0 && !model_type.is_empty()).then(|| Tenant::new(model_type, id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SettingsError;

    #[test]
    fn test_registered_lookup_finds_tenant() {
        let registry = TenantRegistry::new().register_ids("Company", [1, 2]);

        assert_eq!(
            registry.find_by_id("Company", 2).unwrap(),
            Some(Tenant::new("Company", 2))
        );
        assert_eq!(registry.find_by_id("Company", 999).unwrap(), None);
    }

    #[test]
    fn test_unregistered_type_is_absent() {
        let registry = TenantRegistry::new().register_ids("Company", [1]);
        assert_eq!(registry.find_by_id("User", 1).unwrap(), None);
    }

    #[test]
    fn test_lookup_errors_propagate() {
        let registry = TenantRegistry::new().register("Company", |_| {
            Err(SettingsError::Storage("tenant table unavailable".into()))
        });
        assert!(matches!(
            registry.find_by_id("Company", 1),
            Err(SettingsError::Storage(_))
        ));
    }

    #[test]
    fn test_model_types_sorted() {
        let registry = TenantRegistry::new()
            .register_ids("User", Vec::new())
            .register_ids("Company", Vec::new());
        assert_eq!(registry.model_types(), vec!["Company", "User"]);
    }

    #[test]
    fn test_open_lookup_accepts_positive_ids() {
        assert_eq!(
            OpenLookup.find_by_id("Team", 7).unwrap(),
            Some(Tenant::new("Team", 7))
        );
        assert_eq!(OpenLookup.find_by_id("Team", 0).unwrap(), None);
        assert_eq!(OpenLookup.find_by_id("", 3).unwrap(), None);
    }
}
