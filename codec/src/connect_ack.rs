use crate::base::{DecodePacket, EncodePacket};
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, PacketType};
use crate::property::Properties;
use crate::reason_code::ReasonCode;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectAckFlags {
    pub session_present: bool,
}

impl From<ConnectAckFlags> for u8 {
    fn from(flags: ConnectAckFlags) -> Self {
        u8::from(flags.session_present)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectAckPacket {
    pub ack_flags: ConnectAckFlags,
    pub reason_code: ReasonCode,
    pub properties: Properties,
}

impl ConnectAckPacket {
    #[must_use]
    pub fn success(session_present: bool) -> Self {
        Self {
            ack_flags: ConnectAckFlags { session_present },
            reason_code: ReasonCode::Success,
            properties: Properties::new(),
        }
    }

    #[must_use]
    pub fn failure(reason_code: ReasonCode) -> Self {
        Self {
            ack_flags: ConnectAckFlags::default(),
            reason_code,
            properties: Properties::new(),
        }
    }
}

impl DecodePacket for ConnectAckPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let _fixed_header = FixedHeader::decode(ba)?;
        let flags_byte = ba.read_byte()?;
        let ack_flags = ConnectAckFlags {
            session_present: flags_byte & 0x01 != 0,
        };
        let reason_code = ReasonCode::try_from(ba.read_byte()?)?;
        let properties = Properties::decode(ba)?;
        Ok(Self {
            ack_flags,
            reason_code,
            properties,
        })
    }
}

impl EncodePacket for ConnectAckPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let mut payload = Vec::new();
        payload.push(self.ack_flags.into());
        payload.push(self.reason_code.code());
        self.properties.encode(&mut payload)?;

        let fixed_header = FixedHeader::new(PacketType::ConnectAck, payload.len())
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
    fn success_round_trip() {
        let packet = ConnectAckPacket::success(false);
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(buf[0], 0x20);
        let mut ba = ByteArray::new(&buf);
        let decoded = ConnectAckPacket::decode(&mut ba).unwrap();
        assert_eq!(decoded.reason_code, ReasonCode::Success);
    }

    #[test]
    fn failure_round_trip() {
        let packet = ConnectAckPacket::failure(ReasonCode::BadUserNameOrPassword);
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        let decoded = ConnectAckPacket::decode(&mut ba).unwrap();
        assert_eq!(decoded.reason_code.code(), 0x86);
    }
}
