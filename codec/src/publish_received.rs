use crate::base::{DecodePacket, EncodePacket, PacketId};
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, PacketType};
use crate::property::Properties;
use crate::reason_code::ReasonCode;

/// PUBREC: first acknowledgement in the QoS 2 flow, confirming receipt of a
/// PUBLISH and requesting a PUBREL before delivery may proceed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishReceivedPacket {
    pub packet_id: PacketId,
    pub reason_code: ReasonCode,
    pub properties: Properties,
}

impl PublishReceivedPacket {
    #[must_use]
    pub fn new(packet_id: PacketId) -> Self {
        Self {
            packet_id,
            reason_code: ReasonCode::Success,
            properties: Properties::new(),
        }
    }
}

impl DecodePacket for PublishReceivedPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let _fixed_header = FixedHeader::decode(ba)?;
        let packet_id = ba.read_u16()?;
        if ba.remaining_bytes() == 0 {
            return Ok(Self::new(packet_id));
        }
        let reason_code = ReasonCode::try_from(ba.read_byte()?)?;
        let properties = if ba.remaining_bytes() == 0 {
            Properties::new()
        } else {
            Properties::decode(ba)?
        };
        Ok(Self {
            packet_id,
            reason_code,
            properties,
        })
    }
}

impl EncodePacket for PublishReceivedPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&self.packet_id.to_be_bytes());
        payload.push(self.reason_code.code());
        self.properties.encode(&mut payload)?;

        let fixed_header = FixedHeader::new(PacketType::PublishReceived, payload.len())
            .map_err(|_| EncodeError::TooManyData)?;
        let header_len = fixed_header.encode(buf)?;
        buf.extend_from_slice(&payload);
        Ok(header_len + payload.len())
    }
}
