//! Cache entry types.
//!
//! All three entry kinds carry the same timing fields; expiry is computed
//! against a caller-supplied instant so sweeps and tests share one code
//! path.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use beagle_proto::{Record, ResultCode};

/// A positively cached record.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached record, TTL as stored.
    pub record: Record,
    /// When the entry was inserted.
    pub inserted_at: Instant,
    /// When the entry stops being served.
    pub expires_at: Instant,
    /// The clamped TTL the entry was stored with.
    pub original_ttl: u32,
    /// Times this entry has been returned.
    pub hit_count: u64,
}

impl CacheEntry {
    /// Creates an entry starting its TTL at `now`.
    pub fn new(record: Record, ttl: u32, now: Instant) -> Self {
        Self {
            record,
            inserted_at: now,
            expires_at: now + Duration::from_secs(u64::from(ttl)),
            original_ttl: ttl,
            hit_count: 0,
        }
    }

    /// Returns true if the entry is expired as of `now`.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Returns the whole seconds of TTL remaining as of `now`.
    #[inline]
    pub fn remaining_ttl(&self, now: Instant) -> u32 {
        if now >= self.expires_at {
            return 0;
        }
        (self.expires_at - now).as_secs() as u32
    }
}

/// A cached nameserver address for a delegated domain.
#[derive(Debug, Clone)]
pub struct NsEntry {
    /// The nameserver's IPv4 address.
    pub ip: Ipv4Addr,
    /// When the entry was inserted.
    pub inserted_at: Instant,
    /// When the entry stops being served.
    pub expires_at: Instant,
    /// The clamped TTL the entry was stored with.
    pub original_ttl: u32,
    /// Times this entry has been returned.
    pub hit_count: u64,
}

impl NsEntry {
    /// Creates an entry starting its TTL at `now`.
    pub fn new(ip: Ipv4Addr, ttl: u32, now: Instant) -> Self {
        Self {
            ip,
            inserted_at: now,
            expires_at: now + Duration::from_secs(u64::from(ttl)),
            original_ttl: ttl,
            hit_count: 0,
        }
    }

    /// Returns true if the entry is expired as of `now`.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// A cached negative outcome (NXDOMAIN or SERVFAIL).
#[derive(Debug, Clone)]
pub struct NegativeEntry {
    /// The result code that failed the lookup.
    pub rescode: ResultCode,
    /// When the entry was inserted.
    pub inserted_at: Instant,
    /// When the entry stops being served.
    pub expires_at: Instant,
    /// The clamped TTL the entry was stored with.
    pub original_ttl: u32,
    /// Times this entry has been returned.
    pub hit_count: u64,
}

impl NegativeEntry {
    /// Creates an entry starting its TTL at `now`.
    pub fn new(rescode: ResultCode, ttl: u32, now: Instant) -> Self {
        Self {
            rescode,
            inserted_at: now,
            expires_at: now + Duration::from_secs(u64::from(ttl)),
            original_ttl: ttl,
            hit_count: 0,
        }
    }

    /// Returns true if the entry is expired as of `now`.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}
