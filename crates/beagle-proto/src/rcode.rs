//! DNS result codes.
//!
//! The RCODE field in the low nibble of a response header's second flag
//! byte indicates the status of the response (RFC 1035 Section 4.1.1).

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// DNS response result code.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
pub enum ResultCode {
    /// No error condition.
    NoError = 0,

    /// Format error: the server was unable to interpret the query.
    FormErr = 1,

    /// Server failure: the server was unable to process the query.
    ServFail = 2,

    /// Name error: the queried domain name does not exist.
    NXDomain = 3,

    /// Not implemented: the server does not support this kind of query.
    NotImp = 4,

    /// Refused: the server refuses to answer for policy reasons.
    Refused = 5,
}

impl ResultCode {
    /// Returns the numeric value of the result code.
    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Creates a result code from the 4-bit header RCODE field.
    ///
    /// Values outside the known set decode as `NoError`.
    #[inline]
    pub fn from_low_nibble(value: u8) -> Self {
        Self::try_from(value & 0x0F).unwrap_or(Self::NoError)
    }

    /// Returns true if this code indicates success.
    #[inline]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::NoError)
    }

    /// Returns true if this code is cached in the negative cache.
    #[inline]
    pub const fn is_negative(self) -> bool {
        matches!(self, Self::NXDomain | Self::ServFail)
    }

    /// Returns the conventional name of the result code.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoError => "NOERROR",
            Self::FormErr => "FORMERR",
            Self::ServFail => "SERVFAIL",
            Self::NXDomain => "NXDOMAIN",
            Self::NotImp => "NOTIMP",
            Self::Refused => "REFUSED",
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Default for ResultCode {
    fn default() -> Self {
        Self::NoError
    }
}
