//! DNS query/record types.

use serde::{Deserialize, Serialize};

/// The record type being queried or carried by a record.
///
/// Types outside the supported set are preserved as `Unknown` with their
/// numeric value so they can be skipped and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryType {
    /// An unsupported type, carrying the wire value.
    Unknown(u16),
    /// IPv4 host address.
    A, // 1
    /// Authoritative name server.
    Ns, // 2
    /// Canonical name alias.
    Cname, // 5
    /// Mail exchange.
    Mx, // 15
    /// IPv6 host address.
    Aaaa, // 28
}

impl QueryType {
    /// Returns the numeric wire value of this type.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        match self {
            Self::Unknown(value) => value,
            Self::A => 1,
            Self::Ns => 2,
            Self::Cname => 5,
            Self::Mx => 15,
            Self::Aaaa => 28,
        }
    }

    /// Maps a numeric wire value to a query type.
    #[inline]
    pub const fn from_u16(value: u16) -> Self {
        match value {
            1 => Self::A,
            2 => Self::Ns,
            5 => Self::Cname,
            15 => Self::Mx,
            28 => Self::Aaaa,
            _ => Self::Unknown(value),
        }
    }

    /// Returns the conventional name of this type.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown(_) => "UNKNOWN",
            Self::A => "A",
            Self::Ns => "NS",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::Aaaa => "AAAA",
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(value) => write!(f, "TYPE{}", value),
            _ => write!(f, "{}", self.name()),
        }
    }
}
