//! # Beagle UDP service
//!
//! The front end of the resolver: a UDP listener on the service port, a
//! per-client rate limiter gating admission, and a fixed pool of worker
//! tasks that parse queries, drive the recursive resolver, and send the
//! responses back.

use std::net::SocketAddr;

use serde::Deserialize;
use thiserror::Error;

pub mod handler;
pub mod limiter;
pub mod stats;
pub mod udp;
pub mod worker;

pub use limiter::{RateLimitConfig, RateLimiter};
pub use stats::ServerStats;
pub use udp::UdpServer;
pub use worker::QueryTask;

/// Server errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Socket-level failure.
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire format failure while serializing a response.
    #[error("wire format error: {0}")]
    Proto(#[from] beagle_proto::Error),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server configuration. The compiled-in defaults are the service's
/// production settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the service listens on.
    pub listen: SocketAddr,
    /// Worker task count; 0 means one per hardware thread.
    pub workers: usize,
    /// Pending query queue depth.
    pub queue_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:2053".parse().expect("static address parses"),
            workers: 0,
            queue_depth: 1024,
        }
    }
}

impl ServerConfig {
    /// Resolves the effective worker count.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }

        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}
