//! Cache Layer Module
//!
//! Two-tier cache of decoded per-scope settings: a process-local snapshot in
//! front of the external backend, both bounded by the configured TTL.
//!
//! Backend failures never surface from here. They are logged, counted and the
//! caller falls back to the persistent store.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::cache::{CacheBackend, LayerStats, LayerStatsSnapshot};
use crate::error::{CacheBackendError, Result};
use crate::store::SettingsMap;
use crate::tenant::TenantScope;

#[derive(Debug, Clone)]
struct Snapshot {
    settings: Arc<SettingsMap>,
    expires_at: Option<Instant>,
}

impl Snapshot {
    fn new(settings: Arc<SettingsMap>, ttl_seconds: u64) -> Self {
        let expires_at = if ttl_seconds == 0 {
            None
        } else {
            Instant::now().checked_add(Duration::from_secs(ttl_seconds))
        };
        Self {
            settings,
            expires_at,
        }
    }

    fn is_fresh(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

// == Cache Layer ==
pub struct CacheLayer {
    backend: Arc<dyn CacheBackend>,
    enabled: AtomicBool,
    prefix: String,
    ttl_seconds: u64,
    snapshots: RwLock<HashMap<TenantScope, Snapshot>>,
    stats: LayerStats,
}

impl CacheLayer {
    // == Constructor ==
    /// Creates an enabled layer. A TTL of zero seconds keeps entries until invalidated.
    pub fn new(backend: Arc<dyn CacheBackend>, prefix: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            backend,
            enabled: AtomicBool::new(true),
            prefix: prefix.into(),
            ttl_seconds,
            snapshots: RwLock::new(HashMap::new()),
            stats: LayerStats::default(),
        }
    }

    pub fn with_enabled(self, enabled: bool) -> Self {
        self.set_enabled(enabled);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Toggles caching at runtime. Invalidation keeps working while disabled.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Whether `clear_all` can evict by prefix without a scope list.
    pub fn supports_bulk_flush(&self) -> bool {
        self.backend.supports_bulk_flush()
    }

    /// External cache key of a scope: `{prefix}:settings:{scope}`.
    pub fn cache_key(&self, scope: &TenantScope) -> String {
        format!("{}{}", self.key_prefix(), scope)
    }

    fn key_prefix(&self) -> String {
        format!("{}:settings:", self.prefix)
    }

    // == Read Through ==
    /// Returns the scope's settings from the local snapshot, then the backend,
    /// and only then from `loader`, populating both tiers on the way back.
    ///
    /// With caching disabled `loader` is called directly and nothing is stored.
    pub fn read_through<F>(&self, scope: &TenantScope, loader: F) -> Result<Arc<SettingsMap>>
    where
        F: FnOnce() -> Result<SettingsMap>,
    {
        if !self.is_enabled() {
            return loader().map(Arc::new);
        }

        if let Some(settings) = self.snapshot(scope) {
            self.stats.record_local_hit();
            debug!(scope = %scope, "Settings served from local snapshot");
            return Ok(settings);
        }

        if let Some(settings) = self.fetch_backend(scope) {
            self.stats.record_backend_hit();
            debug!(scope = %scope, "Settings served from cache backend");
            self.store_local(scope, settings.clone());
            return Ok(settings);
        }

        self.stats.record_load();
        debug!(scope = %scope, "Settings cache miss, loading from store");
        let settings = Arc::new(loader()?);
        self.store_backend(scope, &settings);
        self.store_local(scope, settings.clone());
        Ok(settings)
    }

    // == Snapshot ==
    /// Current unexpired local snapshot of a scope, if caching is enabled.
    pub fn snapshot(&self, scope: &TenantScope) -> Option<Arc<SettingsMap>> {
        if !self.is_enabled() {
            return None;
        }
        {
            let snapshots = self.snapshots.read();
            match snapshots.get(scope) {
                Some(snapshot) if snapshot.is_fresh() => return Some(snapshot.settings.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut snapshots = self.snapshots.write();
        if snapshots.get(scope).is_some_and(|snapshot| !snapshot.is_fresh()) {
            snapshots.remove(scope);
        }
        None
    }

    /// Drops expired local snapshots. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut snapshots = self.snapshots.write();
        let before = snapshots.len();
        snapshots.retain(|_, snapshot| snapshot.is_fresh());
        before - snapshots.len()
    }

    /// Number of scopes held in the local tier, expired or not.
    pub fn local_len(&self) -> usize {
        self.snapshots.read().len()
    }

    // == Put ==
    /// Write-through refresh of both tiers. No-op while disabled.
    pub fn put(&self, scope: &TenantScope, settings: SettingsMap) {
        if !self.is_enabled() {
            return;
        }
        let settings = Arc::new(settings);
        self.store_backend(scope, &settings);
        self.store_local(scope, settings);
    }

    // == Invalidate ==
    /// Drops both tiers for a scope, whether or not caching is enabled.
    pub fn invalidate(&self, scope: &TenantScope) {
        self.snapshots.write().remove(scope);

        let key = self.cache_key(scope);
        match self.backend.forget(&key) {
            Ok(_) => debug!(scope = %scope, "Invalidated settings cache"),
            Err(e) => self.degrade(&key, &e),
        }
    }

    /// Invalidates every listed scope. Returns how many were processed.
    pub fn invalidate_all<'a, I>(&self, scopes: I) -> usize
    where
        I: IntoIterator<Item = &'a TenantScope>,
    {
        scopes
            .into_iter()
            .map(|scope| self.invalidate(scope))
            .count()
    }

    /// Drops every cached scope.
    ///
    /// Uses the backend's prefix flush when offered; otherwise invalidates the
    /// global scope, `known_scopes` and every locally cached scope one by one.
    pub fn clear_all(&self, known_scopes: &[TenantScope]) -> usize {
        let local: Vec<TenantScope> = self.snapshots.write().drain().map(|(s, _)| s).collect();

        if self.backend.supports_bulk_flush() {
            match self.backend.flush_prefix(&self.key_prefix()) {
                Ok(flushed) => {
                    debug!(flushed, "Flushed settings cache by prefix");
                    return flushed;
                }
                Err(e) => self.degrade(&self.key_prefix(), &e),
            }
        }

        let global = TenantScope::Global;
        let mut scopes: BTreeSet<&TenantScope> = known_scopes.iter().chain(local.iter()).collect();
        scopes.insert(&global);
        self.invalidate_all(scopes)
    }

    pub fn stats(&self) -> LayerStatsSnapshot {
        self.stats.snapshot()
    }

    // == Tier Helpers ==
    fn store_local(&self, scope: &TenantScope, settings: Arc<SettingsMap>) {
        self.snapshots
            .write()
            .insert(scope.clone(), Snapshot::new(settings, self.ttl_seconds));
    }

    fn fetch_backend(&self, scope: &TenantScope) -> Option<Arc<SettingsMap>> {
        let key = self.cache_key(scope);
        match self.backend.get(&key) {
            Ok(Some(bytes)) => match serde_json::from_slice::<SettingsMap>(&bytes) {
                Ok(settings) => Some(Arc::new(settings)),
                Err(e) => {
                    self.degrade(&key, &CacheBackendError::from(e));
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.degrade(&key, &e);
                None
            }
        }
    }

    fn store_backend(&self, scope: &TenantScope, settings: &SettingsMap) {
        let key = self.cache_key(scope);
        let stored = serde_json::to_vec(settings)
            .map_err(CacheBackendError::from)
            .and_then(|bytes| self.backend.put(&key, bytes, self.ttl_seconds));

        if let Err(e) = stored {
            self.degrade(&key, &e);
        }
    }

    fn degrade(&self, key: &str, err: &CacheBackendError) {
        self.stats.record_backend_error();
        warn!(key, error = %err, "Settings cache backend failure ignored");
    }
}

impl fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheLayer")
            .field("enabled", &self.is_enabled())
            .field("prefix", &self.prefix)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("local_scopes", &self.local_len())
            .finish()
    }
}
