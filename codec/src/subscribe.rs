use crate::base::{DecodePacket, EncodePacket, PacketId, QoS};
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, PacketType};
use crate::property::Properties;
use crate::string_data::StringData;

/// One (filter, subscription options) pair from a SUBSCRIBE packet. Only
/// the QoS bits of the options byte are modeled; retain-handling and
/// no-local/retain-as-published bits are not exposed by this core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeTopic {
    pub filter: String,
    pub qos: QoS,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribePacket {
    pub packet_id: PacketId,
    pub properties: Properties,
    pub topics: Vec<SubscribeTopic>,
}

impl DecodePacket for SubscribePacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        let packet_id = ba.read_u16()?;
        let properties = Properties::decode(ba)?;

        let mut consumed = 0usize;
        let payload_len = fixed_header
            .remaining_length()
            .saturating_sub(2 + properties.bytes());
        let mut topics = Vec::new();
        while consumed < payload_len {
            let before = ba.remaining_bytes();
            let filter: String = StringData::decode(ba)?.into();
            if filter.is_empty() {
                return Err(DecodeError::EmptyTopic);
            }
            let options = ba.read_byte()?;
            let qos = QoS::try_from(options & 0x03)?;
            topics.push(SubscribeTopic { filter, qos });
            consumed += before - ba.remaining_bytes();
        }

        if topics.is_empty() {
            return Err(DecodeError::PacketIncomplete);
        }

        Ok(Self {
            packet_id,
            properties,
            topics,
        })
    }
}

impl EncodePacket for SubscribePacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&self.packet_id.to_be_bytes());
        self.properties.encode(&mut payload)?;
        for topic in &self.topics {
            StringData::new(&topic.filter).encode(&mut payload)?;
            payload.push(u8::from(topic.qos));
        }

        let fixed_header = FixedHeader::new(PacketType::Subscribe, payload.len())
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
    fn round_trip_multiple_filters() {
        let packet = SubscribePacket {
            packet_id: 5,
            properties: Properties::new(),
            topics: vec![
                SubscribeTopic {
                    filter: "a/+".to_string(),
                    qos: QoS::AtLeastOnce,
                },
                SubscribeTopic {
                    filter: "b/#".to_string(),
                    qos: QoS::ExactlyOnce,
                },
            ],
        };
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(buf[0], 0x82);
        let mut ba = ByteArray::new(&buf);
        assert_eq!(SubscribePacket::decode(&mut ba).unwrap(), packet);
    }
}
