use crate::base::{DecodePacket, EncodePacket, PacketId};
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, PacketType};
use crate::property::Properties;
use crate::reason_code::ReasonCode;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeAckPacket {
    pub packet_id: PacketId,
    pub properties: Properties,
    /// One reason code per filter in the originating SUBSCRIBE, in order.
    /// `GrantedQoS0/1/2` on success, `UnspecifiedError` (0x80) on failure.
    pub reason_codes: Vec<ReasonCode>,
}

impl DecodePacket for SubscribeAckPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        let packet_id = ba.read_u16()?;
        let properties = Properties::decode(ba)?;

        let payload_len = fixed_header
            .remaining_length()
            .saturating_sub(2 + properties.bytes());
        let mut reason_codes = Vec::with_capacity(payload_len);
        for _ in 0..payload_len {
            reason_codes.push(ReasonCode::try_from(ba.read_byte()?)?);
        }

        Ok(Self {
            packet_id,
            properties,
            reason_codes,
        })
    }
}

impl EncodePacket for SubscribeAckPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&self.packet_id.to_be_bytes());
        self.properties.encode(&mut payload)?;
        for rc in &self.reason_codes {
            payload.push(rc.code());
        }

        let fixed_header = FixedHeader::new(PacketType::SubscribeAck, payload.len())
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
    fn round_trip_mixed_results() {
        let packet = SubscribeAckPacket {
            packet_id: 9,
            properties: Properties::new(),
            reason_codes: vec![
                ReasonCode::GrantedQoS1,
                ReasonCode::UnspecifiedError,
                ReasonCode::Success,
            ],
        };
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(buf[0], 0x90);
        let mut ba = ByteArray::new(&buf);
        assert_eq!(SubscribeAckPacket::decode(&mut ba).unwrap(), packet);
    }
}
