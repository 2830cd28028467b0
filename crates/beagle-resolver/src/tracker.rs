//! In-flight transaction tracking.
//!
//! Every outbound query carries a 16-bit transaction id that must be
//! unique across in-flight queries; the tracker is the table that makes
//! the uniqueness check and the response binding possible.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;
use tracing::trace;

use beagle_proto::QueryType;

use crate::{ResolverError, Result};

/// Attempts made to find a free id before giving up.
const MAX_ID_ATTEMPTS: u32 = 5;

/// One outstanding query.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// The transaction id on the wire.
    pub id: u16,
    /// The queried name.
    pub qname: String,
    /// The queried type.
    pub qtype: QueryType,
    /// The server the query went to.
    pub server: SocketAddr,
    /// When the query was sent.
    pub sent_at: Instant,
}

impl Transaction {
    /// Returns true if the transaction has been outstanding longer than
    /// `timeout`.
    pub fn is_expired(&self, timeout: Duration, now: Instant) -> bool {
        now.duration_since(self.sent_at) > timeout
    }
}

/// Table of in-flight transactions keyed by id.
#[derive(Debug, Default)]
pub struct TransactionTracker {
    in_flight: Mutex<HashMap<u16, Transaction>>,
    collisions: AtomicU64,
}

impl TransactionTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws a uniform random id not currently in flight.
    ///
    /// Tries up to five times; exhausting the attempts is fatal for the
    /// query rather than risking a collision.
    pub fn allocate_id(&self) -> Result<u16> {
        let mut rng = rand::thread_rng();

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = rng.gen_range(1..=u16::MAX);
            if !self.contains(id) {
                return Ok(id);
            }
            self.collisions.fetch_add(1, Ordering::Relaxed);
        }

        Err(ResolverError::IdCollisions {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Registers an outstanding query under its id.
    pub fn register(&self, id: u16, qname: &str, qtype: QueryType, server: SocketAddr) {
        let txn = Transaction {
            id,
            qname: qname.to_string(),
            qtype,
            server,
            sent_at: Instant::now(),
        };

        self.in_flight.lock().insert(id, txn);
    }

    /// Returns true if `id` is in flight.
    pub fn contains(&self, id: u16) -> bool {
        self.in_flight.lock().contains_key(&id)
    }

    /// Removes a completed transaction.
    pub fn remove(&self, id: u16) {
        self.in_flight.lock().remove(&id);
    }

    /// Removes transactions outstanding longer than `timeout`, returning
    /// how many were dropped.
    pub fn cleanup(&self, timeout: Duration) -> usize {
        let now = Instant::now();
        let mut in_flight = self.in_flight.lock();

        let before = in_flight.len();
        in_flight.retain(|_, txn| !txn.is_expired(timeout, now));
        let removed = before - in_flight.len();

        if removed > 0 {
            trace!(removed, "swept stale transactions");
        }
        removed
    }

    /// Number of transactions currently in flight.
    pub fn len(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Returns true if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.in_flight.lock().is_empty()
    }

    /// Total id allocation collisions since startup.
    pub fn collisions(&self) -> u64 {
        self.collisions.load(Ordering::Relaxed)
    }
}
