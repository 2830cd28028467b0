//! Whole DNS message assembly and parsing.

use std::net::Ipv4Addr;

use crate::buffer::PacketBuf;
use crate::error::Result;
use crate::header::Header;
use crate::question::Question;
use crate::record::Record;

/// A complete DNS message: header plus four sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    /// The message header.
    pub header: Header,
    /// Question section.
    pub questions: Vec<Question>,
    /// Answer section.
    pub answers: Vec<Record>,
    /// Authority section.
    pub authorities: Vec<Record>,
    /// Additional section.
    pub resources: Vec<Record>,
}

impl Packet {
    /// Creates an empty packet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a packet from a buffer positioned at the start of a message.
    pub fn from_buffer(buffer: &mut PacketBuf) -> Result<Self> {
        let mut result = Packet::new();
        result.header.read(buffer)?;

        for _ in 0..result.header.questions {
            result.questions.push(Question::read(buffer)?);
        }

        for _ in 0..result.header.answers {
            result.answers.push(Record::read(buffer)?);
        }

        for _ in 0..result.header.authoritative_entries {
            result.authorities.push(Record::read(buffer)?);
        }

        for _ in 0..result.header.resource_entries {
            result.resources.push(Record::read(buffer)?);
        }

        Ok(result)
    }

    /// Serializes the packet into a buffer, recomputing the section counts.
    pub fn write(&mut self, buffer: &mut PacketBuf) -> Result<()> {
        self.header.questions = self.questions.len() as u16;
        self.header.answers = self.answers.len() as u16;
        self.header.authoritative_entries = self.authorities.len() as u16;
        self.header.resource_entries = self.resources.len() as u16;

        self.header.write(buffer)?;

        for question in &self.questions {
            question.write(buffer)?;
        }

        for record in &self.answers {
            record.write(buffer)?;
        }

        for record in &self.authorities {
            record.write(buffer)?;
        }

        for record in &self.resources {
            record.write(buffer)?;
        }

        Ok(())
    }

    /// Returns the address of the first A record in the answer section.
    pub fn first_a(&self) -> Option<Ipv4Addr> {
        self.answers.iter().find_map(|record| match record {
            Record::A { addr, .. } => Some(*addr),
            _ => None,
        })
    }

    /// Returns `(domain, host)` pairs for NS records in the authority
    /// section whose domain is a suffix of `qname`.
    pub fn nameservers_for<'a>(
        &'a self,
        qname: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.authorities.iter().filter_map(move |record| {
            if let Record::Ns { domain, host, .. } = record {
                if domain_is_suffix(qname, domain) {
                    return Some((domain.as_str(), host.as_str()));
                }
            }
            None
        })
    }

    /// Returns the address of a referred nameserver whose A record appears
    /// as glue in the additional section.
    pub fn resolved_ns(&self, qname: &str) -> Option<Ipv4Addr> {
        for (_, host) in self.nameservers_for(qname) {
            for resource in &self.resources {
                if let Record::A { domain, addr, .. } = resource {
                    if domain == host {
                        return Some(*addr);
                    }
                }
            }
        }

        None
    }

    /// Returns the host name of the first referred nameserver, glued or not.
    pub fn unresolved_ns<'a>(&'a self, qname: &'a str) -> Option<&'a str> {
        self.nameservers_for(qname).map(|(_, host)| host).next()
    }
}

/// Returns true when removing a trailing `domain` from `qname` leaves
/// either the empty string or a string ending in `.`.
fn domain_is_suffix(qname: &str, domain: &str) -> bool {
    match qname.strip_suffix(domain) {
        Some(prefix) => prefix.is_empty() || prefix.ends_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qtype::QueryType;
    use crate::rcode::ResultCode;

    fn referral_packet() -> Packet {
        let mut packet = Packet::new();
        packet.header.id = 42;
        packet.header.response = true;
        packet.authorities.push(Record::Ns {
            domain: "google.com".to_string(),
            host: "ns1.google.com".to_string(),
            ttl: 172800,
        });
        packet.authorities.push(Record::Ns {
            domain: "google.com".to_string(),
            host: "ns2.google.com".to_string(),
            ttl: 172800,
        });
        packet.resources.push(Record::A {
            domain: "ns2.google.com".to_string(),
            addr: Ipv4Addr::new(216, 239, 34, 10),
            ttl: 172800,
        });
        packet
    }

    #[test]
    fn test_packet_roundtrip() {
        let mut packet = Packet::new();
        packet.header.id = 9475;
        packet.header.recursion_desired = true;
        packet
            .questions
            .push(Question::new("google.com".to_string(), QueryType::A));

        let mut buf = PacketBuf::new();
        packet.write(&mut buf).unwrap();

        let mut reread = PacketBuf::from_bytes(buf.as_slice());
        let parsed = Packet::from_buffer(&mut reread).unwrap();

        assert_eq!(parsed, packet);
        assert_eq!(parsed.header.questions, 1);
    }

    #[test]
    fn test_counts_recomputed_on_write() {
        let mut packet = Packet::new();
        packet.header.answers = 7; // stale count
        packet.answers.push(Record::A {
            domain: "example.com".to_string(),
            addr: Ipv4Addr::new(1, 2, 3, 4),
            ttl: 60,
        });

        let mut buf = PacketBuf::new();
        packet.write(&mut buf).unwrap();
        assert_eq!(packet.header.answers, 1);
    }

    #[test]
    fn test_suffix_match() {
        assert!(domain_is_suffix("google.com", "google.com"));
        assert!(domain_is_suffix("www.google.com", "google.com"));
        assert!(!domain_is_suffix("evilgoogle.com", "google.com"));
        assert!(!domain_is_suffix("google.com.attacker.net", "google.com"));
    }

    #[test]
    fn test_nameservers_for() {
        let packet = referral_packet();

        let pairs: Vec<_> = packet.nameservers_for("www.google.com").collect();
        assert_eq!(
            pairs,
            vec![
                ("google.com", "ns1.google.com"),
                ("google.com", "ns2.google.com"),
            ]
        );

        assert_eq!(packet.nameservers_for("example.org").count(), 0);
    }

    #[test]
    fn test_resolved_and_unresolved_ns() {
        let packet = referral_packet();

        // ns2 has glue, ns1 does not
        assert_eq!(
            packet.resolved_ns("www.google.com"),
            Some(Ipv4Addr::new(216, 239, 34, 10))
        );
        assert_eq!(packet.unresolved_ns("www.google.com"), Some("ns1.google.com"));
        assert_eq!(packet.resolved_ns("example.org"), None);
    }

    #[test]
    fn test_first_a() {
        let mut packet = Packet::new();
        packet.header.rescode = ResultCode::NoError;
        assert_eq!(packet.first_a(), None);

        packet.answers.push(Record::Cname {
            domain: "www.example.com".to_string(),
            host: "example.com".to_string(),
            ttl: 60,
        });
        packet.answers.push(Record::A {
            domain: "example.com".to_string(),
            addr: Ipv4Addr::new(93, 184, 216, 34),
            ttl: 60,
        });

        assert_eq!(packet.first_a(), Some(Ipv4Addr::new(93, 184, 216, 34)));
    }
}
