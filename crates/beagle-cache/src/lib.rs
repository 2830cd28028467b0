//! # Beagle DNS cache
//!
//! Three TTL-disciplined maps under a single reader-writer lock:
//!
//! - **positive**: question key → bucket of cached records, bounded by an
//!   LRU eviction policy
//! - **NS**: delegated domain → nameserver IPv4 address
//! - **negative**: question key → cached NXDOMAIN/SERVFAIL outcome
//!
//! Entries are removed lazily when a lookup touches an expired bucket, by
//! the periodic background expirer, or by LRU eviction at insert time.
//! Every stored TTL is clamped into the configured bounds; TTL=0 records
//! are an instruction not to cache and are dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use beagle_proto::{QueryType, Record, ResultCode};

pub mod entry;
pub mod key;
pub mod lru;
pub mod stats;

pub use entry::{CacheEntry, NegativeEntry, NsEntry};
pub use key::make_key;
pub use stats::{CacheStats, StatsSnapshot};

use lru::LruIndex;

/// Cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL floor for positive and NS entries, seconds.
    pub min_ttl: u32,
    /// TTL ceiling for positive and NS entries, seconds.
    pub max_ttl: u32,
    /// TTL floor for negative entries, seconds.
    pub negative_min_ttl: u32,
    /// TTL ceiling for negative entries, seconds.
    pub negative_max_ttl: u32,
    /// Maximum number of positive cache buckets.
    pub max_entries: usize,
    /// Maximum number of NS cache entries.
    pub max_ns_entries: usize,
    /// How often the background expirer sweeps.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            min_ttl: 60,
            max_ttl: 86_400,
            negative_min_ttl: 60,
            negative_max_ttl: 600,
            max_entries: 10_000,
            max_ns_entries: 1_000,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// The maps and the LRU index, mutated together under one lock.
#[derive(Default)]
struct CacheInner {
    positive: HashMap<String, Vec<CacheEntry>>,
    ns: HashMap<String, NsEntry>,
    negative: HashMap<String, NegativeEntry>,
    lru: LruIndex,
}

/// The multi-tier DNS cache.
pub struct DnsCache {
    config: CacheConfig,
    inner: RwLock<CacheInner>,
    stats: CacheStats,
}

impl DnsCache {
    /// Creates a new cache.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(CacheInner::default()),
            stats: CacheStats::default(),
        }
    }

    /// Looks up cached records for a question.
    ///
    /// Returns an empty list for a cached negative outcome, the bucket's
    /// records with TTLs rewritten to the remaining time for a positive
    /// hit, and `None` on a miss.
    pub fn lookup(&self, qname: &str, qtype: QueryType) -> Option<Vec<Record>> {
        self.lookup_at(qname, qtype, Instant::now())
    }

    /// Looks up a cached nameserver address for a domain.
    pub fn lookup_ns(&self, domain: &str) -> Option<std::net::Ipv4Addr> {
        self.lookup_ns_at(domain, Instant::now())
    }

    /// Caches records for a question, replacing any existing bucket.
    pub fn insert(&self, qname: &str, qtype: QueryType, records: &[Record]) {
        self.insert_at(qname, qtype, records, Instant::now());
    }

    /// Caches a nameserver address for a domain.
    pub fn insert_ns(&self, domain: &str, ip: std::net::Ipv4Addr, ttl: u32) {
        self.insert_ns_at(domain, ip, ttl, Instant::now());
    }

    /// Caches a negative outcome for a question.
    pub fn insert_negative(&self, qname: &str, qtype: QueryType, rescode: ResultCode, ttl: u32) {
        self.insert_negative_at(qname, qtype, rescode, ttl, Instant::now());
    }

    /// Sweeps expired entries from all three maps, returning the number of
    /// positive buckets remaining.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    /// Returns the number of positive cache buckets.
    pub fn len(&self) -> usize {
        self.inner.read().positive.len()
    }

    /// Returns true if the positive cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().positive.is_empty()
    }

    /// Returns the cache counters.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Spawns the background expirer, sweeping every
    /// [`CacheConfig::sweep_interval`] until shutdown.
    pub fn spawn_expirer(
        self: Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await; // first tick completes immediately

            debug!("cache expirer started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let remaining = self.sweep_expired();
                        debug!(remaining_buckets = remaining, "cache sweep complete");
                    }
                    _ = shutdown.recv() => break,
                }
            }
            debug!("cache expirer stopped");
        })
    }

    fn clamp_ttl(&self, ttl: u32) -> u32 {
        if ttl == 0 {
            return 0;
        }
        ttl.clamp(self.config.min_ttl, self.config.max_ttl)
    }

    fn lookup_at(&self, qname: &str, qtype: QueryType, now: Instant) -> Option<Vec<Record>> {
        let key = make_key(qname, qtype);
        let mut inner = self.inner.write();

        // negative outcomes shadow whatever the positive cache holds
        if let Some(entry) = inner.negative.get_mut(&key) {
            if !entry.is_expired(now) {
                entry.hit_count += 1;
                CacheStats::add(&self.stats.neg_hits, 1);
                trace!(key = %key, rescode = %entry.rescode, "negative cache hit");
                return Some(Vec::new());
            }
            inner.negative.remove(&key);
        }

        let mut bucket_emptied = false;
        let records = match inner.positive.get_mut(&key) {
            None => {
                CacheStats::add(&self.stats.misses, 1);
                return None;
            }
            Some(bucket) => {
                let before = bucket.len();
                bucket.retain(|entry| !entry.is_expired(now));

                let removed = (before - bucket.len()) as u64;
                if removed > 0 {
                    CacheStats::add(&self.stats.expirations, removed);
                    CacheStats::sub(&self.stats.current_entries, removed);
                }

                if bucket.is_empty() {
                    bucket_emptied = true;
                    Vec::new()
                } else {
                    let mut records = Vec::with_capacity(bucket.len());
                    for entry in bucket.iter_mut() {
                        entry.hit_count += 1;

                        let mut record = entry.record.clone();
                        record.set_ttl(entry.remaining_ttl(now));
                        records.push(record);
                    }
                    records
                }
            }
        };

        if bucket_emptied {
            inner.positive.remove(&key);
            inner.lru.remove(&key);
            CacheStats::add(&self.stats.misses, 1);
            return None;
        }

        inner.lru.touch(&key);
        CacheStats::add(&self.stats.hits, 1);
        Some(records)
    }

    fn lookup_ns_at(&self, domain: &str, now: Instant) -> Option<std::net::Ipv4Addr> {
        let mut inner = self.inner.write();

        match inner.ns.get_mut(domain) {
            None => {
                CacheStats::add(&self.stats.ns_misses, 1);
                None
            }
            Some(entry) if !entry.is_expired(now) => {
                entry.hit_count += 1;
                let ip = entry.ip;
                CacheStats::add(&self.stats.ns_hits, 1);
                Some(ip)
            }
            Some(_) => {
                inner.ns.remove(domain);
                CacheStats::add(&self.stats.ns_misses, 1);
                None
            }
        }
    }

    fn insert_at(&self, qname: &str, qtype: QueryType, records: &[Record], now: Instant) {
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let ttl = self.clamp_ttl(record.ttl());
            if ttl == 0 {
                continue;
            }

            let mut record = record.clone();
            record.set_ttl(ttl);
            entries.push(CacheEntry::new(record, ttl, now));
        }

        if entries.is_empty() {
            return;
        }

        let key = make_key(qname, qtype);
        let mut inner = self.inner.write();

        while inner.positive.len() >= self.config.max_entries {
            let Some(victim) = inner.lru.pop_tail() else {
                break;
            };
            if let Some(bucket) = inner.positive.remove(&victim) {
                CacheStats::sub(&self.stats.current_entries, bucket.len() as u64);
            }
            CacheStats::add(&self.stats.evictions, 1);
            trace!(key = %victim, "evicted least recently used bucket");
        }

        CacheStats::add(&self.stats.inserts, 1);
        CacheStats::add(&self.stats.current_entries, entries.len() as u64);
        if let Some(old) = inner.positive.insert(key.clone(), entries) {
            CacheStats::sub(&self.stats.current_entries, old.len() as u64);
        }
        inner.lru.touch(&key);
    }

    fn insert_ns_at(&self, domain: &str, ip: std::net::Ipv4Addr, ttl: u32, now: Instant) {
        let ttl = self.clamp_ttl(ttl);
        if ttl == 0 {
            return;
        }

        let mut inner = self.inner.write();
        if inner.ns.len() >= self.config.max_ns_entries {
            debug!(domain = %domain, "ns cache at capacity, insert refused");
            return;
        }

        inner.ns.insert(domain.to_string(), NsEntry::new(ip, ttl, now));
        CacheStats::add(&self.stats.ns_inserts, 1);
    }

    fn insert_negative_at(
        &self,
        qname: &str,
        qtype: QueryType,
        rescode: ResultCode,
        ttl: u32,
        now: Instant,
    ) {
        let ttl = ttl.clamp(self.config.negative_min_ttl, self.config.negative_max_ttl);
        let key = make_key(qname, qtype);

        let mut inner = self.inner.write();
        inner
            .negative
            .insert(key, NegativeEntry::new(rescode, ttl, now));
        CacheStats::add(&self.stats.neg_inserts, 1);
    }

    fn sweep_expired_at(&self, now: Instant) -> usize {
        let mut guard = self.inner.write();
        let CacheInner {
            positive,
            ns,
            negative,
            lru,
        } = &mut *guard;

        let mut expired = 0u64;
        positive.retain(|key, bucket| {
            let before = bucket.len();
            bucket.retain(|entry| !entry.is_expired(now));
            expired += (before - bucket.len()) as u64;

            if bucket.is_empty() {
                lru.remove(key);
                false
            } else {
                true
            }
        });

        if expired > 0 {
            CacheStats::add(&self.stats.expirations, expired);
            CacheStats::sub(&self.stats.current_entries, expired);
        }

        ns.retain(|_, entry| !entry.is_expired(now));
        negative.retain(|_, entry| !entry.is_expired(now));

        positive.len()
    }
}
