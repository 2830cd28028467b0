//! DNS wire format error types.

use thiserror::Error;

/// Result type alias for wire format operations.
pub type Result<T> = std::result::Result<T, Error>;

/// DNS wire format errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Attempted to read past the end of the packet buffer.
    #[error("end of buffer at offset {offset}")]
    EndOfBuffer {
        /// Offset of the failed access.
        offset: usize,
    },

    /// Attempted to write past the end of the packet buffer.
    #[error("buffer full: cannot write at offset {offset}")]
    BufferFull {
        /// Offset of the failed write.
        offset: usize,
    },

    /// A name label exceeds the 63-byte limit.
    #[error("label too long: {length} bytes exceeds maximum of 63")]
    LabelTooLong {
        /// Actual label length.
        length: usize,
    },

    /// A compressed name followed too many pointer jumps.
    ///
    /// The compression format allows cyclic pointer chains; the jump cap
    /// is a hard safety invariant, not a tunable.
    #[error("limit of {max_jumps} compression jumps exceeded")]
    JumpLimitExceeded {
        /// Maximum allowed jumps.
        max_jumps: usize,
    },
}

impl Error {
    /// Creates a new `EndOfBuffer` error.
    #[inline]
    pub fn end_of_buffer(offset: usize) -> Self {
        Self::EndOfBuffer { offset }
    }

    /// Creates a new `BufferFull` error.
    #[inline]
    pub fn buffer_full(offset: usize) -> Self {
        Self::BufferFull { offset }
    }

    /// Returns true if this error indicates a malformed message that should
    /// be dropped rather than answered.
    #[inline]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::EndOfBuffer { .. } | Self::JumpLimitExceeded { .. }
        )
    }
}
