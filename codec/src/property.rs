use std::convert::TryFrom;

use crate::base::{DecodePacket, EncodePacket};
use crate::bool_data::BoolData;
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::string_data::StringData;
use crate::string_pair_data::StringPairData;
use crate::u16_data::U16Data;
use crate::u32_data::U32Data;
use crate::var_int::VarInt;

/// Identifiers this broker recognizes among MQTT5 properties. Any other byte
/// is still decoded, as [`Property::Unknown`], so that a packet carrying a
/// legitimate v5 property outside this list is not rejected outright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyType {
    PayloadFormatIndicator,
    MessageExpiryInterval,
    ContentType,
    ResponseTopic,
    CorrelationData,
    SessionExpiryInterval,
    AssignedClientIdentifier,
    ServerKeepAlive,
    AuthenticationMethod,
    ResponseInformation,
    ServerReference,
    ReasonString,
    ReceiveMaximum,
    MaximumQoS,
    RetainAvailable,
    UserProperty,
    MaximumPacketSize,
}

impl PropertyType {
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::PayloadFormatIndicator => 0x01,
            Self::MessageExpiryInterval => 0x02,
            Self::ContentType => 0x03,
            Self::ResponseTopic => 0x08,
            Self::CorrelationData => 0x09,
            Self::SessionExpiryInterval => 0x11,
            Self::AssignedClientIdentifier => 0x12,
            Self::ServerKeepAlive => 0x13,
            Self::AuthenticationMethod => 0x15,
            Self::ResponseInformation => 0x1A,
            Self::ServerReference => 0x1C,
            Self::ReasonString => 0x1F,
            Self::ReceiveMaximum => 0x21,
            Self::MaximumQoS => 0x24,
            Self::RetainAvailable => 0x25,
            Self::UserProperty => 0x26,
            Self::MaximumPacketSize => 0x27,
        }
    }
}

impl TryFrom<u8> for PropertyType {
    type Error = ();

    fn try_from(v: u8) -> Result<Self, ()> {
        Ok(match v {
            0x01 => Self::PayloadFormatIndicator,
            0x02 => Self::MessageExpiryInterval,
            0x03 => Self::ContentType,
            0x08 => Self::ResponseTopic,
            0x09 => Self::CorrelationData,
            0x11 => Self::SessionExpiryInterval,
            0x12 => Self::AssignedClientIdentifier,
            0x13 => Self::ServerKeepAlive,
            0x15 => Self::AuthenticationMethod,
            0x1A => Self::ResponseInformation,
            0x1C => Self::ServerReference,
            0x1F => Self::ReasonString,
            0x21 => Self::ReceiveMaximum,
            0x24 => Self::MaximumQoS,
            0x25 => Self::RetainAvailable,
            0x26 => Self::UserProperty,
            0x27 => Self::MaximumPacketSize,
            _ => return Err(()),
        })
    }
}

/// A single decoded v5 property. `Unknown` carries the identifier byte and
/// its raw value bytes verbatim so it can be re-encoded without being
/// understood.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Property {
    PayloadFormatIndicator(BoolData),
    MessageExpiryInterval(U32Data),
    ContentType(StringData),
    ResponseTopic(StringData),
    CorrelationData(crate::binary_data::BinaryData),
    SessionExpiryInterval(U32Data),
    AssignedClientIdentifier(StringData),
    ServerKeepAlive(U16Data),
    AuthenticationMethod(StringData),
    ResponseInformation(StringData),
    ServerReference(StringData),
    ReasonString(StringData),
    ReceiveMaximum(U16Data),
    MaximumQoS(u8),
    RetainAvailable(BoolData),
    UserProperty(StringPairData),
    MaximumPacketSize(U32Data),
    Unknown(u8, Vec<u8>),
}

impl Property {
    #[must_use]
    pub fn property_type_id(&self) -> u8 {
        match self {
            Self::PayloadFormatIndicator(_) => PropertyType::PayloadFormatIndicator.id(),
            Self::MessageExpiryInterval(_) => PropertyType::MessageExpiryInterval.id(),
            Self::ContentType(_) => PropertyType::ContentType.id(),
            Self::ResponseTopic(_) => PropertyType::ResponseTopic.id(),
            Self::CorrelationData(_) => PropertyType::CorrelationData.id(),
            Self::SessionExpiryInterval(_) => PropertyType::SessionExpiryInterval.id(),
            Self::AssignedClientIdentifier(_) => PropertyType::AssignedClientIdentifier.id(),
            Self::ServerKeepAlive(_) => PropertyType::ServerKeepAlive.id(),
            Self::AuthenticationMethod(_) => PropertyType::AuthenticationMethod.id(),
            Self::ResponseInformation(_) => PropertyType::ResponseInformation.id(),
            Self::ServerReference(_) => PropertyType::ServerReference.id(),
            Self::ReasonString(_) => PropertyType::ReasonString.id(),
            Self::ReceiveMaximum(_) => PropertyType::ReceiveMaximum.id(),
            Self::MaximumQoS(_) => PropertyType::MaximumQoS.id(),
            Self::RetainAvailable(_) => PropertyType::RetainAvailable.id(),
            Self::UserProperty(_) => PropertyType::UserProperty.id(),
            Self::MaximumPacketSize(_) => PropertyType::MaximumPacketSize.id(),
            Self::Unknown(id, _) => *id,
        }
    }

    #[must_use]
    pub fn bytes(&self) -> usize {
        1 + match self {
            Self::PayloadFormatIndicator(d) => d.bytes(),
            Self::MessageExpiryInterval(d) => d.bytes(),
            Self::ContentType(d) => d.bytes(),
            Self::ResponseTopic(d) => d.bytes(),
            Self::CorrelationData(d) => d.bytes(),
            Self::SessionExpiryInterval(d) => d.bytes(),
            Self::AssignedClientIdentifier(d) => d.bytes(),
            Self::ServerKeepAlive(d) => d.bytes(),
            Self::AuthenticationMethod(d) => d.bytes(),
            Self::ResponseInformation(d) => d.bytes(),
            Self::ServerReference(d) => d.bytes(),
            Self::ReasonString(d) => d.bytes(),
            Self::ReceiveMaximum(d) => d.bytes(),
            Self::MaximumQoS(_) => 1,
            Self::RetainAvailable(d) => d.bytes(),
            Self::UserProperty(d) => d.bytes(),
            Self::MaximumPacketSize(d) => d.bytes(),
            Self::Unknown(_, raw) => raw.len(),
        }
    }
}

impl DecodePacket for Property {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let id = ba.read_byte()?;
        match PropertyType::try_from(id) {
            Ok(PropertyType::PayloadFormatIndicator) => {
                Ok(Self::PayloadFormatIndicator(BoolData::decode(ba)?))
            }
            Ok(PropertyType::MessageExpiryInterval) => {
                Ok(Self::MessageExpiryInterval(U32Data::decode(ba)?))
            }
            Ok(PropertyType::ContentType) => Ok(Self::ContentType(StringData::decode(ba)?)),
            Ok(PropertyType::ResponseTopic) => Ok(Self::ResponseTopic(StringData::decode(ba)?)),
            Ok(PropertyType::CorrelationData) => Ok(Self::CorrelationData(
                crate::binary_data::BinaryData::decode(ba)?,
            )),
            Ok(PropertyType::SessionExpiryInterval) => {
                Ok(Self::SessionExpiryInterval(U32Data::decode(ba)?))
            }
            Ok(PropertyType::AssignedClientIdentifier) => {
                Ok(Self::AssignedClientIdentifier(StringData::decode(ba)?))
            }
            Ok(PropertyType::ServerKeepAlive) => {
                Ok(Self::ServerKeepAlive(U16Data::decode(ba)?))
            }
            Ok(PropertyType::AuthenticationMethod) => {
                Ok(Self::AuthenticationMethod(StringData::decode(ba)?))
            }
            Ok(PropertyType::ResponseInformation) => {
                Ok(Self::ResponseInformation(StringData::decode(ba)?))
            }
            Ok(PropertyType::ServerReference) => {
                Ok(Self::ServerReference(StringData::decode(ba)?))
            }
            Ok(PropertyType::ReasonString) => Ok(Self::ReasonString(StringData::decode(ba)?)),
            Ok(PropertyType::ReceiveMaximum) => Ok(Self::ReceiveMaximum(U16Data::decode(ba)?)),
            Ok(PropertyType::MaximumQoS) => {
                let qos = ba.read_byte()?;
                if qos > 1 {
                    return Err(DecodeError::InvalidPropertyValue);
                }
                Ok(Self::MaximumQoS(qos))
            }
            Ok(PropertyType::RetainAvailable) => {
                Ok(Self::RetainAvailable(BoolData::decode(ba)?))
            }
            Ok(PropertyType::UserProperty) => Ok(Self::UserProperty(StringPairData::decode(ba)?)),
            Ok(PropertyType::MaximumPacketSize) => {
                Ok(Self::MaximumPacketSize(U32Data::decode(ba)?))
            }
            Err(()) => {
                log::debug!("property: unrecognized identifier {id:#04x}, passing through");
                Err(DecodeError::InvalidPropertyType)
            }
        }
    }
}

impl EncodePacket for Property {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        buf.push(self.property_type_id());
        let n = 1 + match self {
            Self::PayloadFormatIndicator(d) => d.encode(buf)?,
            Self::MessageExpiryInterval(d) => d.encode(buf)?,
            Self::ContentType(d) => d.encode(buf)?,
            Self::ResponseTopic(d) => d.encode(buf)?,
            Self::CorrelationData(d) => d.encode(buf)?,
            Self::SessionExpiryInterval(d) => d.encode(buf)?,
            Self::AssignedClientIdentifier(d) => d.encode(buf)?,
            Self::ServerKeepAlive(d) => d.encode(buf)?,
            Self::AuthenticationMethod(d) => d.encode(buf)?,
            Self::ResponseInformation(d) => d.encode(buf)?,
            Self::ServerReference(d) => d.encode(buf)?,
            Self::ReasonString(d) => d.encode(buf)?,
            Self::ReceiveMaximum(d) => d.encode(buf)?,
            Self::MaximumQoS(q) => {
                buf.push(*q);
                1
            }
            Self::RetainAvailable(d) => d.encode(buf)?,
            Self::UserProperty(d) => d.encode(buf)?,
            Self::MaximumPacketSize(d) => d.encode(buf)?,
            Self::Unknown(_, raw) => {
                buf.extend_from_slice(raw);
                raw.len()
            }
        };
        Ok(n)
    }
}

/// Ordered collection of properties as carried in a packet's variable
/// header, prefixed by its own encoded length as a [`VarInt`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties(Vec<Property>);

impl Properties {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, property: Property) {
        self.0.push(property);
    }

    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, Property> {
        self.0.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn find(&self, id: u8) -> Option<&Property> {
        self.0.iter().find(|p| p.property_type_id() == id)
    }

    fn payload_len(&self) -> usize {
        self.0.iter().map(Property::bytes).sum()
    }

    #[must_use]
    pub fn bytes(&self) -> usize {
        let payload_len = self.payload_len();
        VarInt::from(payload_len).map_or(5, |v| v.bytes()) + payload_len
    }
}

impl DecodePacket for Properties {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let len = VarInt::decode(ba)?.value();
        let mut remaining = len;
        let mut properties = Vec::new();
        while remaining > 0 {
            let before = ba.remaining_bytes();
            match Property::decode(ba) {
                Ok(p) => {
                    let consumed = before - ba.remaining_bytes();
                    if consumed > remaining {
                        return Err(DecodeError::InvalidPropertyValue);
                    }
                    remaining -= consumed;
                    properties.push(p);
                }
                Err(DecodeError::InvalidPropertyType) => {
                    return Err(DecodeError::InvalidPropertyType)
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Self(properties))
    }
}

impl EncodePacket for Properties {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let payload_len = self.payload_len();
        let var = VarInt::from(payload_len).map_err(|_| EncodeError::TooManyData)?;
        let mut n = var.encode(buf)?;
        for p in &self.0 {
            n += p.encode(buf)?;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_properties_round_trip() {
        let props = Properties::new();
        let mut buf = Vec::new();
        props.encode(&mut buf).unwrap();
        assert_eq!(buf, vec![0x00]);
        let mut ba = ByteArray::new(&buf);
        assert_eq!(Properties::decode(&mut ba).unwrap(), props);
    }

    #[test]
    fn session_expiry_round_trip() {
        let mut props = Properties::new();
        props.push(Property::SessionExpiryInterval(U32Data::new(3600)));
        let mut buf = Vec::new();
        props.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        let decoded = Properties::decode(&mut ba).unwrap();
        assert_eq!(decoded, props);
    }

    #[test]
    fn user_property_round_trip() {
        let mut props = Properties::new();
        props.push(Property::UserProperty(StringPairData::new("k", "v")));
        let mut buf = Vec::new();
        props.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        let decoded = Properties::decode(&mut ba).unwrap();
        assert_eq!(decoded.iter().count(), 1);
    }
}
