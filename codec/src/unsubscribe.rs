use crate::base::{DecodePacket, EncodePacket, PacketId};
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, PacketType};
use crate::property::Properties;
use crate::string_data::StringData;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsubscribePacket {
    pub packet_id: PacketId,
    pub properties: Properties,
    pub filters: Vec<String>,
}

impl DecodePacket for UnsubscribePacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        let packet_id = ba.read_u16()?;
        let properties = Properties::decode(ba)?;

        let payload_len = fixed_header
            .remaining_length()
            .saturating_sub(2 + properties.bytes());
        let mut consumed = 0usize;
        let mut filters = Vec::new();
        while consumed < payload_len {
            let before = ba.remaining_bytes();
            let filter: String = StringData::decode(ba)?.into();
            if filter.is_empty() {
                return Err(DecodeError::EmptyTopic);
            }
            filters.push(filter);
            consumed += before - ba.remaining_bytes();
        }

        if filters.is_empty() {
            return Err(DecodeError::PacketIncomplete);
        }

        Ok(Self {
            packet_id,
            properties,
            filters,
        })
    }
}

impl EncodePacket for UnsubscribePacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&self.packet_id.to_be_bytes());
        self.properties.encode(&mut payload)?;
        for filter in &self.filters {
            StringData::new(filter).encode(&mut payload)?;
        }

        let fixed_header = FixedHeader::new(PacketType::Unsubscribe, payload.len())
            .map_err(|_| EncodeError::TooManyData)?;
        let header_len = fixed_header.encode(buf)?;
        buf.extend_from_slice(&payload);
        Ok(header_len + payload.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let packet = UnsubscribePacket {
            packet_id: 2,
            properties: Properties::new(),
            filters: vec!["a/b".to_string(), "c/#".to_string()],
        };
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(buf[0], 0xA2);
        let mut ba = ByteArray::new(&buf);
        assert_eq!(UnsubscribePacket::decode(&mut ba).unwrap(), packet);
    }
}
