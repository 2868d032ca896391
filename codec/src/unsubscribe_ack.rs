use crate::base::{DecodePacket, EncodePacket, PacketId};
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, PacketType};
use crate::property::Properties;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsubscribeAckPacket {
    pub packet_id: PacketId,
    pub properties: Properties,
}

impl UnsubscribeAckPacket {
    #[must_use]
    pub fn new(packet_id: PacketId) -> Self {
        Self {
            packet_id,
            properties: Properties::new(),
        }
    }
}

impl DecodePacket for UnsubscribeAckPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let _fixed_header = FixedHeader::decode(ba)?;
        let packet_id = ba.read_u16()?;
        let properties = if ba.remaining_bytes() == 0 {
            Properties::new()
        } else {
            Properties::decode(ba)?
        };
        Ok(Self {
            packet_id,
            properties,
        })
    }
}

impl EncodePacket for UnsubscribeAckPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&self.packet_id.to_be_bytes());
        self.properties.encode(&mut payload)?;

        let fixed_header = FixedHeader::new(PacketType::UnsubscribeAck, payload.len())
            .map_err(|_| EncodeError::TooManyData)?;
        let header_len = fixed_header.encode(buf)?;
        buf.extend_from_slice(&payload);
        Ok(header_len + payload.len())
    }
}
