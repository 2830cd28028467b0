//! DNS question section entries.

use crate::buffer::PacketBuf;
use crate::error::Result;
use crate::qtype::QueryType;

/// A single question: name, type, and class (always 1/IN on the wire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// The domain name being queried.
    pub name: String,
    /// The record type being queried.
    pub qtype: QueryType,
}

impl Question {
    /// Creates a new question.
    pub fn new(name: String, qtype: QueryType) -> Self {
        Self { name, qtype }
    }

    /// Reads a question from the buffer.
    pub fn read(buffer: &mut PacketBuf) -> Result<Self> {
        let name = buffer.read_qname()?;
        let qtype = QueryType::from_u16(buffer.read_u16()?);
        let _class = buffer.read_u16()?;

        Ok(Self { name, qtype })
    }

    /// Writes the question into the buffer.
    pub fn write(&self, buffer: &mut PacketBuf) -> Result<()> {
        buffer.write_qname(&self.name)?;
        buffer.write_u16(self.qtype.to_u16())?;
        buffer.write_u16(1)?; // class IN
        Ok(())
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.qtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_roundtrip() {
        let question = Question::new("google.com".to_string(), QueryType::A);

        let mut buf = PacketBuf::new();
        question.write(&mut buf).unwrap();

        buf.seek(0).unwrap();
        let parsed = Question::read(&mut buf).unwrap();
        assert_eq!(parsed, question);
    }

    #[test]
    fn test_question_class_is_in() {
        let question = Question::new("example.com".to_string(), QueryType::Mx);

        let mut buf = PacketBuf::new();
        question.write(&mut buf).unwrap();

        // last two bytes are the class field
        let bytes = buf.as_slice();
        assert_eq!(&bytes[bytes.len() - 2..], &[0, 1]);
    }
}
