//! Wire codec for the MQTT 5.0 control packets this broker understands.
//!
//! Stateless: every packet type implements [`DecodePacket`]/[`EncodePacket`]
//! over a [`ByteArray`] cursor, independent of connection or session state.

mod base;
mod binary_data;
mod bool_data;
mod byte_array;
mod connect;
mod connect_ack;
mod disconnect;
mod error;
mod header;
mod ping_request;
mod ping_response;
mod property;
mod publish;
mod publish_ack;
mod publish_complete;
mod publish_received;
mod publish_release;
mod reason_code;
mod string_data;
mod string_pair_data;
mod subscribe;
mod subscribe_ack;
mod u16_data;
mod u32_data;
mod unsubscribe;
mod unsubscribe_ack;
mod utils;
mod var_int;

pub use base::{DecodePacket, EncodePacket, PacketId, QoS};
pub use binary_data::BinaryData;
pub use bool_data::BoolData;
pub use byte_array::ByteArray;
pub use connect::{ConnectPacket, Will};
pub use connect_ack::{ConnectAckFlags, ConnectAckPacket};
pub use disconnect::DisconnectPacket;
pub use error::{DecodeError, EncodeError};
pub use header::{FixedHeader, PacketType};
pub use ping_request::PingRequestPacket;
pub use ping_response::PingResponsePacket;
pub use property::{Properties, Property, PropertyType};
pub use publish::PublishPacket;
pub use publish_ack::PublishAckPacket;
pub use publish_complete::PublishCompletePacket;
pub use publish_received::PublishReceivedPacket;
pub use publish_release::PublishReleasePacket;
pub use reason_code::ReasonCode;
pub use string_data::StringData;
pub use string_pair_data::StringPairData;
pub use subscribe::{SubscribePacket, SubscribeTopic};
pub use subscribe_ack::SubscribeAckPacket;
pub use u16_data::U16Data;
pub use u32_data::U32Data;
pub use unsubscribe::UnsubscribePacket;
pub use unsubscribe_ack::UnsubscribeAckPacket;
pub use utils::MAX_CLIENT_ID_LENGTH;
pub use var_int::{VarInt, MAX_VAR_INT};

/// A decoded MQTT control packet, tagged by variant.
#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    Connect(ConnectPacket),
    ConnectAck(ConnectAckPacket),
    Publish(PublishPacket),
    PublishAck(PublishAckPacket),
    PublishReceived(PublishReceivedPacket),
    PublishRelease(PublishReleasePacket),
    PublishComplete(PublishCompletePacket),
    Subscribe(SubscribePacket),
    SubscribeAck(SubscribeAckPacket),
    Unsubscribe(UnsubscribePacket),
    UnsubscribeAck(UnsubscribeAckPacket),
    PingRequest(PingRequestPacket),
    PingResponse(PingResponsePacket),
    Disconnect(DisconnectPacket),
}

impl Packet {
    /// Peeks the fixed header's type nibble without consuming it, then
    /// dispatches to the matching packet's `decode`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the buffer does not hold a complete, valid
    /// packet of a recognized type.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.is_empty() {
            return Err(DecodeError::OutOfRange);
        }
        let mut peek = ByteArray::new(buf);
        let fixed_header = FixedHeader::decode(&mut peek)?;
        if fixed_header.bytes() + fixed_header.remaining_length() > buf.len() {
            return Err(DecodeError::PacketIncomplete);
        }

        let mut ba = ByteArray::new(buf);
        match fixed_header.packet_type() {
            PacketType::Connect => Ok(Self::Connect(ConnectPacket::decode(&mut ba)?)),
            PacketType::ConnectAck => Ok(Self::ConnectAck(ConnectAckPacket::decode(&mut ba)?)),
            PacketType::Publish { .. } => Ok(Self::Publish(PublishPacket::decode(&mut ba)?)),
            PacketType::PublishAck => Ok(Self::PublishAck(PublishAckPacket::decode(&mut ba)?)),
            PacketType::PublishReceived => {
                Ok(Self::PublishReceived(PublishReceivedPacket::decode(&mut ba)?))
            }
            PacketType::PublishRelease => {
                Ok(Self::PublishRelease(PublishReleasePacket::decode(&mut ba)?))
            }
            PacketType::PublishComplete => {
                Ok(Self::PublishComplete(PublishCompletePacket::decode(&mut ba)?))
            }
            PacketType::Subscribe => Ok(Self::Subscribe(SubscribePacket::decode(&mut ba)?)),
            PacketType::SubscribeAck => {
                Ok(Self::SubscribeAck(SubscribeAckPacket::decode(&mut ba)?))
            }
            PacketType::Unsubscribe => Ok(Self::Unsubscribe(UnsubscribePacket::decode(&mut ba)?)),
            PacketType::UnsubscribeAck => {
                Ok(Self::UnsubscribeAck(UnsubscribeAckPacket::decode(&mut ba)?))
            }
            PacketType::PingRequest => Ok(Self::PingRequest(PingRequestPacket::decode(&mut ba)?)),
            PacketType::PingResponse => {
                Ok(Self::PingResponse(PingResponsePacket::decode(&mut ba)?))
            }
            PacketType::Disconnect => Ok(Self::Disconnect(DisconnectPacket::decode(&mut ba)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_dispatches_pingreq() {
        let buf = [0xC0, 0x00];
        assert_eq!(
            Packet::decode(&buf).unwrap(),
            Packet::PingRequest(PingRequestPacket)
        );
    }

    #[test]
    fn decode_reports_incomplete() {
        let buf = [0x30, 0x05, 0x00];
        assert!(matches!(
            Packet::decode(&buf),
            Err(DecodeError::PacketIncomplete)
        ));
    }
}
