use crate::base::{DecodePacket, EncodePacket, PacketId};
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, PacketType};
use crate::property::Properties;
use crate::reason_code::ReasonCode;

/// Acknowledges a QoS 1 PUBLISH. PUBREC/PUBCOMP share this exact shape on
/// the wire; see [`crate::publish_received::PublishReceivedPacket`] and
/// [`crate::publish_complete::PublishCompletePacket`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishAckPacket {
    pub packet_id: PacketId,
    pub reason_code: ReasonCode,
    pub properties: Properties,
}

impl PublishAckPacket {
    #[must_use]
    pub fn new(packet_id: PacketId) -> Self {
        Self {
            packet_id,
            reason_code: ReasonCode::Success,
            properties: Properties::new(),
        }
    }
}

impl DecodePacket for PublishAckPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let _fixed_header = FixedHeader::decode(ba)?;
        let packet_id = ba.read_u16()?;
        if ba.remaining_bytes() == 0 {
            return Ok(Self {
                packet_id,
                reason_code: ReasonCode::Success,
                properties: Properties::new(),
            });
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

impl EncodePacket for PublishAckPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&self.packet_id.to_be_bytes());
        payload.push(self.reason_code.code());
        self.properties.encode(&mut payload)?;

        let fixed_header = FixedHeader::new(PacketType::PublishAck, payload.len())
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
        let packet = PublishAckPacket::new(7);
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(buf[0], 0x40);
        let mut ba = ByteArray::new(&buf);
        assert_eq!(PublishAckPacket::decode(&mut ba).unwrap(), packet);
    }

    #[test]
    fn decodes_packet_id_only_shorthand() {
        let buf = vec![0x40, 0x02, 0x00, 0x07];
        let mut ba = ByteArray::new(&buf);
        let decoded = PublishAckPacket::decode(&mut ba).unwrap();
        assert_eq!(decoded.packet_id, 7);
        assert_eq!(decoded.reason_code, ReasonCode::Success);
    }
}
