//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired entries out of the
//! in-memory cache backend and the cache layer's local snapshots. Reads
//! already treat expired entries as misses; the sweep only reclaims their
//! memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheLayer, MemoryCacheBackend};

/// Spawns a background task that periodically removes expired cache entries.
///
/// The returned handle is aborted during graceful shutdown. An interval of
/// zero is treated as one second.
pub fn spawn_cleanup_task(
    backend: Arc<MemoryCacheBackend>,
    layer: Arc<CacheLayer>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = backend.cleanup_expired();
            let snapshots = layer.cleanup_expired();
            if removed > 0 || snapshots > 0 {
                info!(
                    "Cache cleanup: removed {} expired entries and {} local snapshots",
                    removed, snapshots
                );
            } else {
                debug!("Cache cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheBackend;
    use crate::store::SettingsMap;
    use crate::tenant::{Tenant, TenantScope};

    fn layer_over(backend: &Arc<MemoryCacheBackend>, ttl_seconds: u64) -> Arc<CacheLayer> {
        Arc::new(CacheLayer::new(backend.clone(), "test", ttl_seconds))
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let backend = Arc::new(MemoryCacheBackend::new(100));
        backend
            .put("test:settings:global", b"{}".to_vec(), 1)
            .unwrap();

        let handle = spawn_cleanup_task(backend.clone(), layer_over(&backend, 1), 1);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(backend.is_empty(), "Expired entry should have been cleaned up");
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_snapshots() {
        let backend = Arc::new(MemoryCacheBackend::new(1000));
        let layer = layer_over(&backend, 1);
        for id in 1..=200 {
            let scope = TenantScope::from(&Tenant::new("Company", id));
            layer
                .read_through(&scope, || Ok(SettingsMap::new()))
                .unwrap();
        }
        assert_eq!(layer.local_len(), 200);

        let handle = spawn_cleanup_task(backend.clone(), layer.clone(), 1);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(backend.is_empty());
        assert_eq!(layer.local_len(), 0, "Expired snapshots should have been dropped");
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let backend = Arc::new(MemoryCacheBackend::new(100));
        backend
            .put("test:settings:global", b"{}".to_vec(), 3600)
            .unwrap();
        backend
            .put("test:settings:Company:1", b"{}".to_vec(), 0)
            .unwrap();
        let layer = layer_over(&backend, 3600);
        layer.put(&TenantScope::Global, SettingsMap::new());

        let handle = spawn_cleanup_task(backend.clone(), layer.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(backend.len(), 2, "Valid entries should not be removed");
        assert_eq!(layer.local_len(), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let backend = Arc::new(MemoryCacheBackend::default());
        let handle = spawn_cleanup_task(backend.clone(), layer_over(&backend, 60), 1);
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
