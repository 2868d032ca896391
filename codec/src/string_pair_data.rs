use crate::base::{DecodePacket, EncodePacket};
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::string_data::StringData;

/// Key/value pair of UTF-8 strings, used for `UserProperty`. MQTT5 allows
/// the same key to appear multiple times, so callers hold these in a `Vec`
/// rather than a map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringPairData {
    name: StringData,
    value: StringData,
}

impl StringPairData {
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: StringData::new(name),
            value: StringData::new(value),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    #[must_use]
    pub fn value(&self) -> &str {
        self.value.as_str()
    }

    #[must_use]
    pub fn bytes(&self) -> usize {
        self.name.bytes() + self.value.bytes()
    }
}

impl DecodePacket for StringPairData {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let name = StringData::decode(ba)?;
        let value = StringData::decode(ba)?;
        Ok(Self { name, value })
    }
}

impl EncodePacket for StringPairData {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let mut n = self.name.encode(buf)?;
        n += self.value.encode(buf)?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let p = StringPairData::new("key", "value");
        let mut buf = Vec::new();
        p.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        assert_eq!(StringPairData::decode(&mut ba).unwrap(), p);
    }
}
