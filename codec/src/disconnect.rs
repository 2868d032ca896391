use crate::base::{DecodePacket, EncodePacket};
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, PacketType};
use crate::reason_code::ReasonCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisconnectPacket {
    pub reason_code: ReasonCode,
}

impl DisconnectPacket {
    #[must_use]
    pub const fn new(reason_code: ReasonCode) -> Self {
        Self { reason_code }
    }
}

impl DecodePacket for DisconnectPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        let reason_code = if fixed_header.remaining_length() == 0 {
            ReasonCode::Success
        } else {
            ReasonCode::try_from(ba.read_byte()?)?
        };
        Ok(Self { reason_code })
    }
}

impl EncodePacket for DisconnectPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let fixed_header = FixedHeader::new(PacketType::Disconnect, 1)
            .map_err(|_| EncodeError::TooManyData)?;
        let header_len = fixed_header.encode(buf)?;
        buf.push(self.reason_code.code());
        Ok(header_len + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_exact_header() {
        let packet = DisconnectPacket::new(ReasonCode::Success);
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(buf, vec![0xE0, 0x01, 0x00]);
        let mut ba = ByteArray::new(&buf);
        assert_eq!(DisconnectPacket::decode(&mut ba).unwrap(), packet);
    }
}
