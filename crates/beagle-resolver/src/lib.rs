//! # Beagle recursive resolver
//!
//! Iterative recursive DNS resolution: starting from the root servers,
//! follow the delegation chain (using cached nameservers where possible)
//! until an authoritative answer, a negative answer, or exhaustion.
//!
//! Every outbound query runs on its own freshly bound UDP socket with
//! send/receive timeouts, is retried with exponential backoff on timeout,
//! and is bound to a tracked transaction id. Responses failing id, source,
//! or direction validation are rejected.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub mod recursive;
pub mod retry;
pub mod roots;
pub mod tracker;

pub use recursive::Resolver;
pub use retry::RetryPolicy;
pub use roots::{RootServer, RootServers};
pub use tracker::{Transaction, TransactionTracker};

/// Resolver errors.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// The upstream did not answer within the socket timeout.
    #[error("query timed out")]
    Timeout,

    /// Transaction id allocation kept colliding with in-flight queries.
    #[error("transaction id space exhausted after {attempts} attempts")]
    IdCollisions {
        /// Number of allocation attempts made.
        attempts: u32,
    },

    /// The response id does not match the query we sent.
    #[error("transaction id mismatch: sent {sent:04X}, got {got:04X}")]
    IdMismatch {
        /// The id we sent.
        sent: u16,
        /// The id that came back.
        got: u16,
    },

    /// The response came from an address we did not query.
    #[error("response from unexpected source {got} (queried {queried})")]
    SourceMismatch {
        /// The server we queried.
        queried: std::net::SocketAddr,
        /// The address that answered.
        got: std::net::SocketAddr,
    },

    /// The reply has the query bit set instead of the response bit.
    #[error("received a query instead of a response")]
    NotAResponse,

    /// Nameserver chasing recursed deeper than the configured cap.
    #[error("maximum recursion depth {max_depth} exceeded")]
    MaxDepth {
        /// The configured cap.
        max_depth: u8,
    },

    /// Every root server failed to produce a conclusive answer.
    #[error("all root servers failed")]
    RootsExhausted,

    /// Wire format error in a query or response.
    #[error("wire format error: {0}")]
    Proto(#[from] beagle_proto::Error),

    /// Socket-level failure.
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResolverError {
    /// Returns true if this error is a timeout eligible for retry.
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns true if this error is a response-validation failure.
    #[inline]
    pub fn is_security(&self) -> bool {
        matches!(
            self,
            Self::IdMismatch { .. } | Self::SourceMismatch { .. } | Self::NotAResponse
        )
    }
}

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, ResolverError>;

/// Resolver configuration. The compiled-in defaults are the service's
/// production settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Socket receive timeout per attempt, milliseconds.
    pub recv_timeout_ms: u64,
    /// Socket send timeout per attempt, milliseconds.
    pub send_timeout_ms: u64,
    /// Attempts per nameserver before giving up on it.
    pub max_retries: u32,
    /// Delay before the first retry, milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Multiplier applied to the delay after each retry.
    pub backoff_multiplier: f64,
    /// Maximum depth when recursively resolving unglued nameserver names.
    pub max_depth: u8,
    /// Port queried on nameservers.
    pub upstream_port: u16,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            recv_timeout_ms: 2_000,
            send_timeout_ms: 1_000,
            max_retries: 3,
            initial_retry_delay_ms: 100,
            backoff_multiplier: 2.0,
            max_depth: 16,
            upstream_port: 53,
        }
    }
}

impl ResolverConfig {
    /// Socket receive timeout.
    #[inline]
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    /// Socket send timeout.
    #[inline]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Delay before the first retry.
    #[inline]
    pub fn initial_retry_delay(&self) -> Duration {
        Duration::from_millis(self.initial_retry_delay_ms)
    }
}
