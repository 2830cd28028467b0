//! Cache statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Cache performance counters.
///
/// Counters use relaxed atomics; they are monitoring data and never
/// participate in cache correctness.
#[derive(Debug, Default)]
pub struct CacheStats {
    pub(crate) hits: AtomicU64,
    pub(crate) misses: AtomicU64,
    pub(crate) inserts: AtomicU64,
    pub(crate) evictions: AtomicU64,
    pub(crate) expirations: AtomicU64,

    pub(crate) ns_hits: AtomicU64,
    pub(crate) ns_misses: AtomicU64,
    pub(crate) ns_inserts: AtomicU64,

    pub(crate) neg_hits: AtomicU64,
    pub(crate) neg_misses: AtomicU64,
    pub(crate) neg_inserts: AtomicU64,

    pub(crate) current_entries: AtomicU64,
}

/// A point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsSnapshot {
    /// Positive cache hits.
    pub hits: u64,
    /// Positive cache misses.
    pub misses: u64,
    /// Positive bucket inserts.
    pub inserts: u64,
    /// Buckets removed by LRU eviction.
    pub evictions: u64,
    /// Entries removed by expiry.
    pub expirations: u64,
    /// NS cache hits.
    pub ns_hits: u64,
    /// NS cache misses.
    pub ns_misses: u64,
    /// NS cache inserts.
    pub ns_inserts: u64,
    /// Negative cache hits.
    pub neg_hits: u64,
    /// Negative cache misses.
    pub neg_misses: u64,
    /// Negative cache inserts.
    pub neg_inserts: u64,
    /// Records currently held in the positive cache.
    pub current_entries: u64,
}

impl CacheStats {
    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            ns_hits: self.ns_hits.load(Ordering::Relaxed),
            ns_misses: self.ns_misses.load(Ordering::Relaxed),
            ns_inserts: self.ns_inserts.load(Ordering::Relaxed),
            neg_hits: self.neg_hits.load(Ordering::Relaxed),
            neg_misses: self.neg_misses.load(Ordering::Relaxed),
            neg_inserts: self.neg_inserts.load(Ordering::Relaxed),
            current_entries: self.current_entries.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn sub(counter: &AtomicU64, n: u64) {
        counter.fetch_sub(n, Ordering::Relaxed);
    }
}

impl StatsSnapshot {
    /// Positive cache hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64 * 100.0
    }

    /// NS cache hit rate as a percentage.
    pub fn ns_hit_rate(&self) -> f64 {
        let total = self.ns_hits + self.ns_misses;
        if total == 0 {
            return 0.0;
        }
        self.ns_hits as f64 / total as f64 * 100.0
    }
}
