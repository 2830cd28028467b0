//! Server statistics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Service-level counters.
#[derive(Debug)]
pub struct ServerStats {
    start_time: Instant,

    /// Datagrams received on the service socket.
    pub queries: AtomicU64,
    /// Responses sent back to clients.
    pub responses: AtomicU64,
    /// Queries denied by the rate limiter.
    pub rate_limited: AtomicU64,
    /// Requests that failed to parse.
    pub parse_errors: AtomicU64,
    /// Responses answered with SERVFAIL after a resolution failure.
    pub servfails: AtomicU64,
}

impl ServerStats {
    /// Creates fresh counters.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            queries: AtomicU64::new(0),
            responses: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            servfails: AtomicU64::new(0),
        }
    }

    /// Time since the server started.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Counts a received datagram.
    pub fn inc_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a sent response.
    pub fn inc_response(&self) {
        self.responses.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a rate-limited query.
    pub fn inc_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an unparseable request.
    pub fn inc_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a SERVFAIL answer.
    pub fn inc_servfail(&self) {
        self.servfails.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}
