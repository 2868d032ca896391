use crate::base::{DecodePacket, EncodePacket, QoS};
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, PacketType};
use crate::property::Properties;
use crate::string_data::StringData;
use crate::var_int::VarInt;

const PROTOCOL_NAME: &str = "MQTT";
const PROTOCOL_LEVEL: u8 = 5;

/// Bits of the CONNECT variable header's `connect_flags` byte.
mod connect_flags {
    pub const USERNAME: u8 = 0b1000_0000;
    pub const PASSWORD: u8 = 0b0100_0000;
    pub const WILL_RETAIN: u8 = 0b0010_0000;
    pub const WILL_QOS_MASK: u8 = 0b0001_1000;
    pub const WILL_FLAG: u8 = 0b0000_0100;
    pub const CLEAN_SESSION: u8 = 0b0000_0010;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Will {
    pub properties: Properties,
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectPacket {
    pub protocol_level: u8,
    pub clean_session: bool,
    pub keep_alive: u16,
    pub properties: Properties,
    pub client_id: String,
    pub will: Option<Will>,
    pub username: Option<String>,
    pub password: Option<Vec<u8>>,
}

impl ConnectPacket {
    #[must_use]
    pub fn packet_type(&self) -> PacketType {
        PacketType::Connect
    }
}

impl DecodePacket for ConnectPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let _fixed_header = FixedHeader::decode(ba)?;

        let protocol_name = StringData::decode(ba)?;
        if protocol_name.as_str() != PROTOCOL_NAME {
            return Err(DecodeError::InvalidProtocolName);
        }

        // Acceptance of a non-5 protocol_level is deferred to the broker's
        // CONNECT handling, which rejects it with a CONNACK instead of
        // silently dropping the connection.
        let protocol_level = ba.read_byte()?;

        let flags = ba.read_byte()?;
        let will_flag = flags & connect_flags::WILL_FLAG != 0;
        let will_qos_bits = (flags & connect_flags::WILL_QOS_MASK) >> 3;
        let will_retain = flags & connect_flags::WILL_RETAIN != 0;
        if !will_flag && (will_qos_bits != 0 || will_retain) {
            return Err(DecodeError::InvalidPacketFlags);
        }
        let clean_session = flags & connect_flags::CLEAN_SESSION != 0;
        let has_username = flags & connect_flags::USERNAME != 0;
        let has_password = flags & connect_flags::PASSWORD != 0;

        let keep_alive = ba.read_u16()?;
        let properties = Properties::decode(ba)?;
        // client_id length/emptiness is validated downstream by the broker's
        // repository, not here, so a CONNACK can still be sent on rejection.
        let client_id = StringData::decode(ba)?.into();

        let will = if will_flag {
            let will_properties = Properties::decode(ba)?;
            let topic: String = StringData::decode(ba)?.into();
            if topic.is_empty() {
                return Err(DecodeError::EmptyTopic);
            }
            let payload_len = ba.read_u16()? as usize;
            let payload = ba.read_bytes(payload_len)?.to_vec();
            let qos = QoS::try_from(will_qos_bits)?;
            Some(Will {
                properties: will_properties,
                topic,
                payload,
                qos,
                retain: will_retain,
            })
        } else {
            None
        };

        let username = if has_username {
            Some(StringData::decode(ba)?.into())
        } else {
            None
        };
        let password = if has_password {
            let len = ba.read_u16()? as usize;
            Some(ba.read_bytes(len)?.to_vec())
        } else {
            None
        };

        Ok(Self {
            protocol_level,
            clean_session,
            keep_alive,
            properties,
            client_id,
            will,
            username,
            password,
        })
    }
}

impl EncodePacket for ConnectPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let mut payload = Vec::new();
        StringData::new(PROTOCOL_NAME).encode(&mut payload)?;
        payload.push(self.protocol_level);

        let mut flags = 0u8;
        if self.clean_session {
            flags |= connect_flags::CLEAN_SESSION;
        }
        if let Some(will) = &self.will {
            flags |= connect_flags::WILL_FLAG;
            flags |= u8::from(will.qos) << 3;
            if will.retain {
                flags |= connect_flags::WILL_RETAIN;
            }
        }
        if self.username.is_some() {
            flags |= connect_flags::USERNAME;
        }
        if self.password.is_some() {
            flags |= connect_flags::PASSWORD;
        }
        payload.push(flags);

        payload.extend_from_slice(&self.keep_alive.to_be_bytes());
        self.properties.encode(&mut payload)?;
        StringData::new(&self.client_id).encode(&mut payload)?;

        if let Some(will) = &self.will {
            will.properties.encode(&mut payload)?;
            StringData::new(&will.topic).encode(&mut payload)?;
            payload.extend_from_slice(&(will.payload.len() as u16).to_be_bytes());
            payload.extend_from_slice(&will.payload);
        }
        if let Some(username) = &self.username {
            StringData::new(username).encode(&mut payload)?;
        }
        if let Some(password) = &self.password {
            payload.extend_from_slice(&(password.len() as u16).to_be_bytes());
            payload.extend_from_slice(password);
        }

        let fixed_header = FixedHeader::new(PacketType::Connect, payload.len())
            .map_err(|_| EncodeError::TooManyData)?;
        let header_len = fixed_header.encode(buf)?;
        buf.extend_from_slice(&payload);
        Ok(header_len + payload.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConnectPacket {
        ConnectPacket {
            protocol_level: PROTOCOL_LEVEL,
            clean_session: true,
            keep_alive: 60,
            properties: Properties::new(),
            client_id: "c1".to_string(),
            will: None,
            username: None,
            password: None,
        }
    }

    #[test]
    fn round_trip_no_will() {
        let packet = sample();
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        assert_eq!(ConnectPacket::decode(&mut ba).unwrap(), packet);
    }

    #[test]
    fn round_trip_with_will_and_credentials() {
        let mut packet = sample();
        packet.will = Some(Will {
            properties: Properties::new(),
            topic: "last/will".to_string(),
            payload: b"bye".to_vec(),
            qos: QoS::AtLeastOnce,
            retain: true,
        });
        packet.username = Some("alice".to_string());
        packet.password = Some(b"secret".to_vec());

        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        assert_eq!(ConnectPacket::decode(&mut ba).unwrap(), packet);
    }

    #[test]
    fn rejects_will_flags_without_will() {
        let mut buf = Vec::new();
        StringData::new(PROTOCOL_NAME).encode(&mut buf).unwrap();
        buf.push(PROTOCOL_LEVEL);
        buf.push(connect_flags::WILL_RETAIN);
        buf.extend_from_slice(&60u16.to_be_bytes());
        Properties::new().encode(&mut buf).unwrap();
        StringData::new("c1").encode(&mut buf).unwrap();

        let mut full = Vec::new();
        FixedHeader::new(PacketType::Connect, buf.len())
            .unwrap()
            .encode(&mut full)
            .unwrap();
        full.extend_from_slice(&buf);

        let mut ba = ByteArray::new(&full);
        assert!(matches!(
            ConnectPacket::decode(&mut ba),
            Err(DecodeError::InvalidPacketFlags)
        ));
    }

    #[test]
    fn decodes_nonstandard_protocol_level_unvalidated() {
        let mut buf = Vec::new();
        StringData::new(PROTOCOL_NAME).encode(&mut buf).unwrap();
        buf.push(4);
        buf.push(0);
        buf.extend_from_slice(&60u16.to_be_bytes());
        Properties::new().encode(&mut buf).unwrap();
        StringData::new("c1").encode(&mut buf).unwrap();

        let mut full = Vec::new();
        FixedHeader::new(PacketType::Connect, buf.len())
            .unwrap()
            .encode(&mut full)
            .unwrap();
        full.extend_from_slice(&buf);

        let mut ba = ByteArray::new(&full);
        let packet = ConnectPacket::decode(&mut ba).unwrap();
        assert_eq!(packet.protocol_level, 4);
    }
}
