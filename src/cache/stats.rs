//! Cache Statistics Module
//!
//! Counters for the in-memory backend and for the two-tier cache layer.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Backend Stats ==
/// Performance counters of the in-memory cache backend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Successful retrievals
    pub hits: u64,
    /// Failed retrievals (absent or expired)
    pub misses: u64,
    /// Entries evicted by the LRU policy
    pub evictions: u64,
    /// Current number of entries
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// hits / (hits + misses), or 0.0 before any request.
    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits, self.hits + self.misses)
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}

// == Layer Stats ==
/// Lock-free counters for `CacheLayer` reads and degradations.
#[derive(Debug, Default)]
pub struct LayerStats {
    local_hits: AtomicU64,
    backend_hits: AtomicU64,
    loads: AtomicU64,
    backend_errors: AtomicU64,
}

/// Point-in-time copy of `LayerStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LayerStatsSnapshot {
    /// Reads served from the process-local snapshot
    pub local_hits: u64,
    /// Reads served from the external backend
    pub backend_hits: u64,
    /// Reads that fell through to the persistent store
    pub loads: u64,
    /// Backend failures swallowed as degradation
    pub backend_errors: u64,
}

impl LayerStats {
    pub fn record_local_hit(&self) {
        self.local_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backend_hit(&self) {
        self.backend_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backend_error(&self) {
        self.backend_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LayerStatsSnapshot {
        LayerStatsSnapshot {
            local_hits: self.local_hits.load(Ordering::Relaxed),
            backend_hits: self.backend_hits.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            backend_errors: self.backend_errors.load(Ordering::Relaxed),
        }
    }
}

impl LayerStatsSnapshot {
    /// Share of reads that never reached the persistent store.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.local_hits + self.backend_hits;
        ratio(hits, hits + self.loads)
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}
