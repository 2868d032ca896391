use std::fmt;
use std::string::FromUtf8Error;

/// Errors encountered while parsing a byte stream into a packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Not enough bytes remain in the buffer to satisfy a read.
    OutOfRange,

    /// Fixed header packet type nibble does not map to a known packet type.
    InvalidPacketType,

    /// Fixed header flag bits do not match the fixed value required for this packet type.
    InvalidPacketFlags,

    /// Remaining Length variable-length integer overflowed the 4 byte limit.
    InvalidVarInt,

    /// A UTF-8 string field contained invalid UTF-8 data.
    InvalidString,

    /// Protocol name in CONNECT was not "MQTT".
    InvalidProtocolName,

    /// QoS bits did not map to 0, 1 or 2.
    InvalidQoS,

    /// A property identifier byte did not map to a known property, and is not
    /// one of the identifiers this broker is required to tolerate.
    InvalidPropertyType,

    /// A property's encoded value did not match the shape required by its type.
    InvalidPropertyValue,

    /// Packet-level reason code byte did not map to a known reason code.
    InvalidReasonCode,

    /// Topic name or topic filter was empty where a non-empty value is required.
    EmptyTopic,

    /// Topic filter used wildcard characters in a context where they are forbidden.
    InvalidTopicFilter,

    /// Packet declared a Remaining Length that does not match the bytes actually present.
    PacketIncomplete,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for DecodeError {}

impl From<FromUtf8Error> for DecodeError {
    fn from(_e: FromUtf8Error) -> Self {
        Self::InvalidString
    }
}

/// Errors encountered while serializing a packet into a byte stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// Remaining Length would exceed the 4 byte variable-length integer limit.
    TooManyData,

    /// A string or binary field exceeded the 16 bit length prefix.
    InvalidString,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for EncodeError {}
