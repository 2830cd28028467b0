//! Per-client rate limiting.
//!
//! Each client IP gets a sliding window of recent query timestamps. A
//! query is admitted if fewer than the configured maximum landed inside
//! the window; denied queries get no response at all, so a flood costs
//! the service nothing downstream.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, trace};

/// Rate limiter configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Queries a client may issue per window.
    pub max_queries_per_window: u32,
    /// Sliding window length.
    pub window: Duration,
    /// How long an idle client record is retained before the sweep drops it.
    pub idle_retention: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_queries_per_window: 250,
            window: Duration::from_secs(1),
            idle_retention: Duration::from_secs(10),
        }
    }
}

/// Per-client bookkeeping.
#[derive(Debug)]
struct ClientRecord {
    query_times: VecDeque<Instant>,
    total_queries: u64,
    rate_limited: u64,
    last_seen: Instant,
}

impl ClientRecord {
    fn new(now: Instant) -> Self {
        Self {
            query_times: VecDeque::new(),
            total_queries: 0,
            rate_limited: 0,
            last_seen: now,
        }
    }

    /// Drops timestamps that fell out of the window.
    fn expire_old(&mut self, window: Duration, now: Instant) {
        let Some(window_start) = now.checked_sub(window) else {
            return;
        };
        while let Some(&front) = self.query_times.front() {
            if front >= window_start {
                break;
            }
            self.query_times.pop_front();
        }
    }
}

/// Sliding-window admission control keyed by client IP.
pub struct RateLimiter {
    config: RateLimitConfig,
    clients: Mutex<HashMap<IpAddr, ClientRecord>>,
}

impl RateLimiter {
    /// Creates a rate limiter.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Decides whether a query from `client` is admitted.
    pub fn allow(&self, client: IpAddr) -> bool {
        self.allow_at(client, Instant::now())
    }

    /// Drops client records idle longer than the retention window,
    /// returning how many were removed.
    pub fn sweep_idle(&self) -> usize {
        self.sweep_idle_at(Instant::now())
    }

    /// Number of clients currently tracked.
    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Total queries denied across all clients still tracked.
    pub fn total_rate_limited(&self) -> u64 {
        self.clients
            .lock()
            .values()
            .map(|record| record.rate_limited)
            .sum()
    }

    fn allow_at(&self, client: IpAddr, now: Instant) -> bool {
        let mut clients = self.clients.lock();
        let record = clients
            .entry(client)
            .or_insert_with(|| ClientRecord::new(now));

        record.expire_old(self.config.window, now);
        record.last_seen = now;

        if record.query_times.len() >= self.config.max_queries_per_window as usize {
            record.rate_limited += 1;
            trace!(client = %client, "query rate limited");
            return false;
        }

        record.query_times.push_back(now);
        record.total_queries += 1;
        true
    }

    fn sweep_idle_at(&self, now: Instant) -> usize {
        let mut clients = self.clients.lock();

        let before = clients.len();
        clients.retain(|_, record| now.duration_since(record.last_seen) < self.config.idle_retention);
        let removed = before - clients.len();

        if removed > 0 {
            debug!(removed, remaining = clients.len(), "swept idle clients");
        }
        removed
    }
}
