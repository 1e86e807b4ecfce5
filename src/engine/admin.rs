//! Engine Administration
//!
//! Cache clearing and default installation for operators.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::engine::SettingsEngine;
use crate::error::{Result, SettingsError};
use crate::store::SettingsMap;
use crate::tenant::TenantScope;

// == Cache Target ==
/// What `clear_cache` evicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheTarget {
    /// Every cached scope
    All,
    /// One scope, global included
    Scope(TenantScope),
}

impl FromStr for CacheTarget {
    type Err = SettingsError;

    /// Parses `all`, `global` or `{type}:{id}`.
    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CacheTarget::All);
        }
        s.parse().map(CacheTarget::Scope)
    }
}

impl fmt::Display for CacheTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTarget::All => f.write_str("all"),
            CacheTarget::Scope(scope) => write!(f, "{}", scope),
        }
    }
}

// == Install Report ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub installed: usize,
    pub skipped: usize,
}

impl SettingsEngine {
    // == Clear Cache ==
    /// Evicts cached settings. Returns the number of scopes (or backend
    /// entries, on a bulk flush) evicted.
    pub fn clear_cache(&self, target: &CacheTarget) -> Result<usize> {
        let cleared = match target {
            CacheTarget::Scope(scope) => {
                self.cache.invalidate(scope);
                1
            }
            CacheTarget::All => {
                let known = if self.cache.supports_bulk_flush() {
                    Vec::new()
                } else {
                    self.store.list_scopes()?
                };
                self.cache.clear_all(&known)
            }
        };

        info!(cache_target = %target, cleared, "Cleared settings cache");
        Ok(cleared)
    }

    // == Install Defaults ==
    /// Writes default settings into the engine's scope.
    ///
    /// Each entry is a bare value or `{"value": .., "description": ..}`.
    /// Keys already set are skipped unless `force` is true.
    pub fn install_defaults(&self, defaults: &SettingsMap, force: bool) -> Result<InstallReport> {
        let mut report = InstallReport::default();

        for (key, entry) in defaults {
            if !force && self.has(key)? {
                debug!(key, "Default skipped, setting already present");
                report.skipped += 1;
                continue;
            }

            match split_default(entry) {
                (value, Some(description)) => self.set_with_description(key, value, description)?,
                (value, None) => self.set(key, value)?,
            };
            report.installed += 1;
        }

        info!(
            scope = %self.scope(),
            installed = report.installed,
            skipped = report.skipped,
            "Installed default settings"
        );
        Ok(report)
    }
}

/// Splits a defaults entry into its value and optional description.
fn split_default(entry: &Value) -> (Value, Option<&str>) {
    match entry.as_object() {
        Some(object) if object.contains_key("value") => (
            object.get("value").cloned().unwrap_or(Value::Null),
            object.get("description").and_then(Value::as_str),
        ),
        _ => (entry.clone(), None),
    }
}
