//! Cache Module
//!
//! The external cache backend abstraction, its in-memory implementation with
//! TTL expiration and LRU eviction, and the two-tier settings cache layer.

pub(crate) mod backend;
mod entry;
mod layer;
mod lru;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use backend::{BackendResult, CacheBackend, MemoryCacheBackend};
pub use entry::CacheEntry;
pub use layer::CacheLayer;
pub use lru::LruTracker;
pub use stats::{CacheStats, LayerStats, LayerStatsSnapshot};

// == Public Constants ==
/// Default key namespace for cached settings.
pub const DEFAULT_PREFIX: &str = "tenant_settings";

/// Default lifetime of cached scopes in seconds.
pub const DEFAULT_TTL_SECONDS: u64 = 3600;
