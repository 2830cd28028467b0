//! # Beagle DNS wire codec
//!
//! RFC 1035 message format over UDP with a 512-byte limit: a fixed-size
//! cursored packet buffer with name compression support, and codecs for
//! headers, questions, and the record types the resolver interprets
//! (A, NS, CNAME, MX, AAAA; everything else is carried as `Unknown`).

pub mod buffer;
pub mod error;
pub mod header;
pub mod packet;
pub mod qtype;
pub mod question;
pub mod rcode;
pub mod record;

pub use buffer::PacketBuf;
pub use error::{Error, Result};
pub use header::Header;
pub use packet::Packet;
pub use qtype::QueryType;
pub use question::Question;
pub use rcode::ResultCode;
pub use record::Record;

/// Maximum DNS message size over plain UDP.
pub const PACKET_SIZE: usize = 512;

/// Maximum length of a single name label.
pub const MAX_LABEL_LENGTH: usize = 63;

/// Maximum number of compression pointer jumps while decoding one name.
pub const MAX_JUMPS: usize = 5;
