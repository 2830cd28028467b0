//! DNS resource records.
//!
//! Every record shares a common preamble (name, type, class, TTL, data
//! length) followed by a type-specific body. The wire type number is the
//! tag selecting the variant; types outside the supported set decode as
//! `Unknown` and are skipped by their data length.

use std::net::{Ipv4Addr, Ipv6Addr};

use tracing::debug;

use crate::buffer::PacketBuf;
use crate::error::Result;
use crate::qtype::QueryType;

/// A single resource record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A record of a type this resolver does not interpret.
    Unknown {
        /// Owner name.
        domain: String,
        /// Numeric wire type.
        qtype: u16,
        /// Length of the skipped body.
        data_len: u16,
        /// Time to live in seconds.
        ttl: u32,
    },
    /// IPv4 host address.
    A {
        /// Owner name.
        domain: String,
        /// The address.
        addr: Ipv4Addr,
        /// Time to live in seconds.
        ttl: u32,
    },
    /// Authoritative name server.
    Ns {
        /// The delegated domain.
        domain: String,
        /// The nameserver host name.
        host: String,
        /// Time to live in seconds.
        ttl: u32,
    },
    /// Canonical name alias.
    Cname {
        /// The alias.
        domain: String,
        /// The canonical name.
        host: String,
        /// Time to live in seconds.
        ttl: u32,
    },
    /// Mail exchange.
    Mx {
        /// Owner name.
        domain: String,
        /// Exchange preference, lower wins.
        priority: u16,
        /// The mail host.
        host: String,
        /// Time to live in seconds.
        ttl: u32,
    },
    /// IPv6 host address.
    Aaaa {
        /// Owner name.
        domain: String,
        /// The address.
        addr: Ipv6Addr,
        /// Time to live in seconds.
        ttl: u32,
    },
}

impl Record {
    /// Reads one record from the buffer.
    pub fn read(buffer: &mut PacketBuf) -> Result<Self> {
        let domain = buffer.read_qname()?;

        let qtype_num = buffer.read_u16()?;
        let qtype = QueryType::from_u16(qtype_num);
        let _class = buffer.read_u16()?;
        let ttl = buffer.read_u32()?;
        let data_len = buffer.read_u16()?;

        match qtype {
            QueryType::A => {
                let raw = buffer.read_u32()?;
                let addr = Ipv4Addr::from(raw);
                Ok(Record::A { domain, addr, ttl })
            }
            QueryType::Ns => {
                let host = buffer.read_qname()?;
                Ok(Record::Ns { domain, host, ttl })
            }
            QueryType::Cname => {
                let host = buffer.read_qname()?;
                Ok(Record::Cname { domain, host, ttl })
            }
            QueryType::Mx => {
                let priority = buffer.read_u16()?;
                let host = buffer.read_qname()?;
                Ok(Record::Mx {
                    domain,
                    priority,
                    host,
                    ttl,
                })
            }
            QueryType::Aaaa => {
                let raw1 = buffer.read_u32()?;
                let raw2 = buffer.read_u32()?;
                let raw3 = buffer.read_u32()?;
                let raw4 = buffer.read_u32()?;
                let addr = Ipv6Addr::from(
                    (u128::from(raw1) << 96)
                        | (u128::from(raw2) << 64)
                        | (u128::from(raw3) << 32)
                        | u128::from(raw4),
                );
                Ok(Record::Aaaa { domain, addr, ttl })
            }
            QueryType::Unknown(_) => {
                buffer.step(data_len as usize)?;
                Ok(Record::Unknown {
                    domain,
                    qtype: qtype_num,
                    data_len,
                    ttl,
                })
            }
        }
    }

    /// Writes this record into the buffer, returning the bytes written.
    ///
    /// Name-bearing bodies write a placeholder length and back-patch it once
    /// the body size is known. `Unknown` records produce no bytes.
    pub fn write(&self, buffer: &mut PacketBuf) -> Result<usize> {
        let start = buffer.pos();

        match self {
            Record::A { domain, addr, ttl } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::A.to_u16())?;
                buffer.write_u16(1)?;
                buffer.write_u32(*ttl)?;
                buffer.write_u16(4)?;
                buffer.write_u32(u32::from(*addr))?;
            }
            Record::Ns { domain, host, ttl } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::Ns.to_u16())?;
                buffer.write_u16(1)?;
                buffer.write_u32(*ttl)?;

                let len_pos = buffer.pos();
                buffer.write_u16(0)?;
                buffer.write_qname(host)?;
                buffer.set_u16(len_pos, (buffer.pos() - (len_pos + 2)) as u16)?;
            }
            Record::Cname { domain, host, ttl } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::Cname.to_u16())?;
                buffer.write_u16(1)?;
                buffer.write_u32(*ttl)?;

                let len_pos = buffer.pos();
                buffer.write_u16(0)?;
                buffer.write_qname(host)?;
                buffer.set_u16(len_pos, (buffer.pos() - (len_pos + 2)) as u16)?;
            }
            Record::Mx {
                domain,
                priority,
                host,
                ttl,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::Mx.to_u16())?;
                buffer.write_u16(1)?;
                buffer.write_u32(*ttl)?;

                let len_pos = buffer.pos();
                buffer.write_u16(0)?;
                buffer.write_u16(*priority)?;
                buffer.write_qname(host)?;
                buffer.set_u16(len_pos, (buffer.pos() - (len_pos + 2)) as u16)?;
            }
            Record::Aaaa { domain, addr, ttl } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::Aaaa.to_u16())?;
                buffer.write_u16(1)?;
                buffer.write_u32(*ttl)?;
                buffer.write_u16(16)?;
                for segment in addr.segments() {
                    buffer.write_u16(segment)?;
                }
            }
            Record::Unknown { domain, qtype, .. } => {
                debug!(domain = %domain, qtype, "skipping unknown record during write");
            }
        }

        Ok(buffer.pos() - start)
    }

    /// Returns the owner name of this record.
    pub fn domain(&self) -> &str {
        match self {
            Record::Unknown { domain, .. }
            | Record::A { domain, .. }
            | Record::Ns { domain, .. }
            | Record::Cname { domain, .. }
            | Record::Mx { domain, .. }
            | Record::Aaaa { domain, .. } => domain,
        }
    }

    /// Returns the record's TTL in seconds.
    pub fn ttl(&self) -> u32 {
        match self {
            Record::Unknown { ttl, .. }
            | Record::A { ttl, .. }
            | Record::Ns { ttl, .. }
            | Record::Cname { ttl, .. }
            | Record::Mx { ttl, .. }
            | Record::Aaaa { ttl, .. } => *ttl,
        }
    }

    /// Rewrites the record's TTL.
    pub fn set_ttl(&mut self, value: u32) {
        match self {
            Record::Unknown { ttl, .. }
            | Record::A { ttl, .. }
            | Record::Ns { ttl, .. }
            | Record::Cname { ttl, .. }
            | Record::Mx { ttl, .. }
            | Record::Aaaa { ttl, .. } => *ttl = value,
        }
    }

    /// Returns the query type this record answers.
    pub fn qtype(&self) -> QueryType {
        match self {
            Record::Unknown { qtype, .. } => QueryType::Unknown(*qtype),
            Record::A { .. } => QueryType::A,
            Record::Ns { .. } => QueryType::Ns,
            Record::Cname { .. } => QueryType::Cname,
            Record::Mx { .. } => QueryType::Mx,
            Record::Aaaa { .. } => QueryType::Aaaa,
        }
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Record::Unknown {
                domain,
                qtype,
                data_len,
                ttl,
            } => write!(
                f,
                "{} TYPE{} len={} ttl={}",
                domain, qtype, data_len, ttl
            ),
            Record::A { domain, addr, ttl } => write!(f, "{} A {} ttl={}", domain, addr, ttl),
            Record::Ns { domain, host, ttl } => write!(f, "{} NS {} ttl={}", domain, host, ttl),
            Record::Cname { domain, host, ttl } => {
                write!(f, "{} CNAME {} ttl={}", domain, host, ttl)
            }
            Record::Mx {
                domain,
                priority,
                host,
                ttl,
            } => write!(f, "{} MX {} {} ttl={}", domain, priority, host, ttl),
            Record::Aaaa { domain, addr, ttl } => {
                write!(f, "{} AAAA {} ttl={}", domain, addr, ttl)
            }
        }
    }
}
