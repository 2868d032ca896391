use crate::base::{DecodePacket, EncodePacket};
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};

/// Opaque byte string prefixed with a 2 byte big-endian length (correlation
/// data, authentication data, PUBLISH payload when carried as a property).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BinaryData(Vec<u8>);

impl BinaryData {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn bytes(&self) -> usize {
        2 + self.0.len()
    }
}

impl DecodePacket for BinaryData {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let len = ba.read_u16()? as usize;
        Ok(Self(ba.read_bytes(len)?.to_vec()))
    }
}

impl EncodePacket for BinaryData {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        if self.0.len() > u16::MAX as usize {
            return Err(EncodeError::InvalidString);
        }
        buf.extend_from_slice(&(self.0.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.0);
        Ok(2 + self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let d = BinaryData::new(vec![1, 2, 3]);
        let mut buf = Vec::new();
        d.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        assert_eq!(BinaryData::decode(&mut ba).unwrap(), d);
    }
}
