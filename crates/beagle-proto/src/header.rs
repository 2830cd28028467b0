//! DNS message header.
//!
//! The header is a fixed 12-byte structure at the start of every DNS
//! message: a 16-bit id, two flag bytes, and four 16-bit section counts.
//!
//! # Wire Format
//!
//! ```text
//!                                 1  1  1  1  1  1
//!   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                      ID                       |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |QR|   Opcode  |AA|TC|RD|RA| Z|AD|CD|   RCODE   |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                    QDCOUNT                    |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                    ANCOUNT                    |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                    NSCOUNT                    |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                    ARCOUNT                    |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! ```

use crate::buffer::PacketBuf;
use crate::error::Result;
use crate::rcode::ResultCode;

/// Size of the DNS header in bytes.
pub const HEADER_SIZE: usize = 12;

/// DNS message header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Message identifier binding responses to outstanding queries.
    pub id: u16,

    /// RD: the client wants the server to resolve recursively.
    pub recursion_desired: bool,
    /// TC: the message was truncated. Propagated as read, never set here.
    pub truncated_message: bool,
    /// AA: the responding server is authoritative for the domain.
    pub authoritative_answer: bool,
    /// 4-bit operation code.
    pub opcode: u8,
    /// QR: this message is a response rather than a query.
    pub response: bool,

    /// Result code in the low nibble of the second flag byte.
    pub rescode: ResultCode,
    /// CD: DNSSEC checking disabled.
    pub checking_disabled: bool,
    /// AD: response data is authenticated.
    pub authed_data: bool,
    /// Z: reserved bit.
    pub z: bool,
    /// RA: the server supports recursion.
    pub recursion_available: bool,

    /// Number of questions.
    pub questions: u16,
    /// Number of answer records.
    pub answers: u16,
    /// Number of authority records.
    pub authoritative_entries: u16,
    /// Number of additional records.
    pub resource_entries: u16,
}

impl Header {
    /// Creates an empty query header.
    pub const fn new() -> Self {
        Self {
            id: 0,
            recursion_desired: false,
            truncated_message: false,
            authoritative_answer: false,
            opcode: 0,
            response: false,
            rescode: ResultCode::NoError,
            checking_disabled: false,
            authed_data: false,
            z: false,
            recursion_available: false,
            questions: 0,
            answers: 0,
            authoritative_entries: 0,
            resource_entries: 0,
        }
    }

    /// Reads a header from the buffer.
    pub fn read(&mut self, buffer: &mut PacketBuf) -> Result<()> {
        self.id = buffer.read_u16()?;

        let flags = buffer.read_u16()?;
        let a = (flags >> 8) as u8;
        let b = (flags & 0xFF) as u8;

        self.recursion_desired = (a & (1 << 0)) > 0;
        self.truncated_message = (a & (1 << 1)) > 0;
        self.authoritative_answer = (a & (1 << 2)) > 0;
        self.opcode = (a >> 3) & 0x0F;
        self.response = (a & (1 << 7)) > 0;

        self.rescode = ResultCode::from_low_nibble(b);
        self.checking_disabled = (b & (1 << 4)) > 0;
        self.authed_data = (b & (1 << 5)) > 0;
        self.z = (b & (1 << 6)) > 0;
        self.recursion_available = (b & (1 << 7)) > 0;

        self.questions = buffer.read_u16()?;
        self.answers = buffer.read_u16()?;
        self.authoritative_entries = buffer.read_u16()?;
        self.resource_entries = buffer.read_u16()?;

        Ok(())
    }

    /// Writes the header into the buffer.
    pub fn write(&self, buffer: &mut PacketBuf) -> Result<()> {
        buffer.write_u16(self.id)?;

        buffer.write_u8(
            u8::from(self.recursion_desired)
                | (u8::from(self.truncated_message) << 1)
                | (u8::from(self.authoritative_answer) << 2)
                | (self.opcode << 3)
                | (u8::from(self.response) << 7),
        )?;

        buffer.write_u8(
            self.rescode.to_u8()
                | (u8::from(self.checking_disabled) << 4)
                | (u8::from(self.authed_data) << 5)
                | (u8::from(self.z) << 6)
                | (u8::from(self.recursion_available) << 7),
        )?;

        buffer.write_u16(self.questions)?;
        buffer.write_u16(self.answers)?;
        buffer.write_u16(self.authoritative_entries)?;
        buffer.write_u16(self.resource_entries)?;

        Ok(())
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "id:{:04X} {} {}",
            self.id,
            if self.response { "QR" } else { "Q" },
            self.rescode
        )?;

        if self.authoritative_answer {
            write!(f, " AA")?;
        }
        if self.truncated_message {
            write!(f, " TC")?;
        }
        if self.recursion_desired {
            write!(f, " RD")?;
        }
        if self.recursion_available {
            write!(f, " RA")?;
        }

        write!(
            f,
            " qd:{} an:{} ns:{} ar:{}",
            self.questions, self.answers, self.authoritative_entries, self.resource_entries
        )
    }
}
