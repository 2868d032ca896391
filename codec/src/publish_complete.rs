use crate::base::{DecodePacket, EncodePacket, PacketId};
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, PacketType};
use crate::property::Properties;
use crate::reason_code::ReasonCode;

/// PUBCOMP: final acknowledgement of the QoS 2 flow, sent in reply to
/// PUBREL. Receiving it completes the exactly-once handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishCompletePacket {
    pub packet_id: PacketId,
    pub reason_code: ReasonCode,
    pub properties: Properties,
}

impl PublishCompletePacket {
    #[must_use]
    pub fn new(packet_id: PacketId) -> Self {
        Self {
            packet_id,
            reason_code: ReasonCode::Success,
            properties: Properties::new(),
        }
    }
}

impl DecodePacket for PublishCompletePacket {
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

impl EncodePacket for PublishCompletePacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&self.packet_id.to_be_bytes());
        payload.push(self.reason_code.code());
        self.properties.encode(&mut payload)?;

        let fixed_header = FixedHeader::new(PacketType::PublishComplete, payload.len())
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
        let packet = PublishCompletePacket::new(3);
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(buf[0], 0x70);
        let mut ba = ByteArray::new(&buf);
        assert_eq!(PublishCompletePacket::decode(&mut ba).unwrap(), packet);
    }
}
