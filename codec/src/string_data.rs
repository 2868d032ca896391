use crate::base::{DecodePacket, EncodePacket};
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};

/// UTF-8 string prefixed with a 2 byte big-endian length, as used throughout
/// the MQTT wire format (topic names, client ids, property string values).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StringData(String);

impl StringData {
    #[must_use]
    pub fn new(s: &str) -> Self {
        Self(s.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn bytes(&self) -> usize {
        2 + self.0.len()
    }
}

impl From<String> for StringData {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<StringData> for String {
    fn from(s: StringData) -> Self {
        s.0
    }
}

impl DecodePacket for StringData {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let len = ba.read_u16()? as usize;
        Ok(Self(ba.read_string(len)?))
    }
}

impl EncodePacket for StringData {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let bytes = self.0.as_bytes();
        if bytes.len() > u16::MAX as usize {
            return Err(EncodeError::InvalidString);
        }
        buf.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
        buf.extend_from_slice(bytes);
        Ok(2 + bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let s = StringData::new("hello");
        let mut buf = Vec::new();
        s.encode(&mut buf).unwrap();
        assert_eq!(buf, vec![0x00, 0x05, b'h', b'e', b'l', b'l', b'o']);
        let mut ba = ByteArray::new(&buf);
        assert_eq!(StringData::decode(&mut ba).unwrap(), s);
    }

    #[test]
    fn empty_string() {
        let s = StringData::new("");
        let mut buf = Vec::new();
        s.encode(&mut buf).unwrap();
        assert_eq!(buf, vec![0x00, 0x00]);
    }
}
