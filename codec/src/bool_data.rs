use crate::base::{DecodePacket, EncodePacket};
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};

/// Single byte holding `0` or `1`, used for boolean-valued v5 properties.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoolData(bool);

impl BoolData {
    #[must_use]
    pub const fn new(value: bool) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(&self) -> bool {
        self.0
    }

    #[must_use]
    pub const fn bytes(&self) -> usize {
        1
    }
}

impl From<bool> for BoolData {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

impl DecodePacket for BoolData {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        match ba.read_byte()? {
            0 => Ok(Self(false)),
            1 => Ok(Self(true)),
            _ => Err(DecodeError::InvalidPropertyValue),
        }
    }
}

impl EncodePacket for BoolData {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        buf.push(u8::from(self.0));
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for value in [true, false] {
            let b = BoolData::new(value);
            let mut buf = Vec::new();
            b.encode(&mut buf).unwrap();
            let mut ba = ByteArray::new(&buf);
            assert_eq!(BoolData::decode(&mut ba).unwrap().value(), value);
        }
    }

    #[test]
    fn invalid_byte_rejected() {
        let buf = [0x02];
        let mut ba = ByteArray::new(&buf);
        assert!(BoolData::decode(&mut ba).is_err());
    }
}
