//! Root server table.
//!
//! The thirteen IANA root servers are the fallback starting points for
//! every resolution that has no usable cached nameserver. Each entry
//! carries running counters the resolver updates as it uses the server;
//! the counters are monitoring data, so relaxed atomics are enough.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// One root server with its performance counters.
#[derive(Debug)]
pub struct RootServer {
    /// Host name of the server.
    pub hostname: &'static str,
    /// IPv4 address of the server.
    pub ipv4: Ipv4Addr,
    /// Port to query, 53 for the real roots.
    pub port: u16,

    avg_latency_us: AtomicU64,
    hits: AtomicU64,
    timeouts: AtomicU64,
}

impl RootServer {
    /// Creates a root server entry.
    pub const fn new(hostname: &'static str, ipv4: Ipv4Addr, port: u16) -> Self {
        Self {
            hostname,
            ipv4,
            port,
            avg_latency_us: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
        }
    }

    /// Returns the socket address to query.
    #[inline]
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(self.ipv4), self.port)
    }

    /// Folds a successful query's latency into the running average and
    /// bumps the hit counter.
    pub fn record_latency(&self, latency: Duration) {
        let latency_us = latency.as_micros() as u64;
        let hits = self.hits.load(Ordering::Relaxed);
        let avg = self.avg_latency_us.load(Ordering::Relaxed);

        let new_avg = (avg * hits + latency_us) / (hits + 1);
        self.avg_latency_us.store(new_avg, Ordering::Relaxed);
        self.hits.store(hits + 1, Ordering::Relaxed);
    }

    /// Bumps the timeout counter.
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Running average latency of successful queries.
    pub fn avg_latency(&self) -> Duration {
        Duration::from_micros(self.avg_latency_us.load(Ordering::Relaxed))
    }

    /// Number of successful queries through this server.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of times this server timed out after retries.
    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }
}

/// The ordered root server list.
#[derive(Debug)]
pub struct RootServers {
    servers: Vec<RootServer>,
}

impl RootServers {
    /// Builds the table from the IANA root hints.
    pub fn builtin() -> Self {
        Self {
            servers: vec![
                RootServer::new("a.root-servers.net", Ipv4Addr::new(198, 41, 0, 4), 53),
                RootServer::new("b.root-servers.net", Ipv4Addr::new(170, 247, 170, 2), 53),
                RootServer::new("c.root-servers.net", Ipv4Addr::new(192, 33, 4, 12), 53),
                RootServer::new("d.root-servers.net", Ipv4Addr::new(199, 7, 91, 13), 53),
                RootServer::new("e.root-servers.net", Ipv4Addr::new(192, 203, 230, 10), 53),
                RootServer::new("f.root-servers.net", Ipv4Addr::new(192, 5, 5, 241), 53),
                RootServer::new("g.root-servers.net", Ipv4Addr::new(192, 112, 36, 4), 53),
                RootServer::new("h.root-servers.net", Ipv4Addr::new(198, 97, 190, 53), 53),
                RootServer::new("i.root-servers.net", Ipv4Addr::new(192, 36, 148, 17), 53),
                RootServer::new("j.root-servers.net", Ipv4Addr::new(192, 58, 128, 30), 53),
                RootServer::new("k.root-servers.net", Ipv4Addr::new(193, 0, 14, 129), 53),
                RootServer::new("l.root-servers.net", Ipv4Addr::new(199, 7, 83, 42), 53),
                RootServer::new("m.root-servers.net", Ipv4Addr::new(202, 12, 27, 33), 53),
            ],
        }
    }

    /// Builds a table from an explicit server list.
    pub fn from_servers(servers: Vec<RootServer>) -> Self {
        Self { servers }
    }

    /// Iterates the servers in list order.
    pub fn iter(&self) -> impl Iterator<Item = &RootServer> {
        self.servers.iter()
    }

    /// Returns the number of servers.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl Default for RootServers {
    fn default() -> Self {
        Self::builtin()
    }
}
