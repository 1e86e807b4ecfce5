//! Tenant Settings - A tenant-scoped typed settings store
//!
//! Persists typed key/value settings per tenant (or globally), enforces a
//! tenancy policy on which tenants may own settings, and serves reads
//! through a two-tier TTL cache.
//!
//! ```ignore
//! let company = engine.bind_tenant(&Tenant::new("Company", 1))?;
//! company.set("lang", "fr")?.set("seats", 25)?;
//! assert_eq!(company.get("lang")?, Some(json!("fr")));
//! ```

pub mod api;
pub mod cache;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;
pub mod tenant;

pub use api::{create_router, AppState};
pub use cache::{CacheBackend, CacheLayer, MemoryCacheBackend};
pub use codec::TypeTag;
pub use config::Config;
pub use engine::{CacheTarget, InstallReport, SettingsEngine};
pub use error::{Result, SettingsError};
pub use store::{MemorySettingsStore, Setting, SettingsMap, SettingsStore, SqliteSettingsStore};
pub use tasks::spawn_cleanup_task;
pub use tenant::{
    OpenLookup, TenancyConfig, TenancyMode, Tenant, TenantLookup, TenantPolicy, TenantRegistry,
    TenantScope,
};
