use std::convert::TryFrom;

use crate::error::DecodeError;

/// Reason codes carried in CONNACK, PUBACK, PUBREC, PUBREL, PUBCOMP and the
/// per-filter return codes of SUBACK. Only the subset this broker actually
/// emits is modeled; an unrecognized byte on input decodes to `Unspecified`
/// with the raw value preserved rather than aborting decode of the packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReasonCode {
    Success,
    GrantedQoS1,
    GrantedQoS2,
    UnspecifiedError,
    MalformedPacket,
    ProtocolError,
    UnsupportedProtocolVersion,
    ClientIdentifierNotValid,
    BadUserNameOrPassword,
    ServerUnavailable,
    ServerBusy,
    Banned,
    PacketTooLarge,
    RetainNotSupported,
    ConnectionRateExceeded,
    Unknown(u8),
}

impl ReasonCode {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0x00,
            Self::GrantedQoS1 => 0x01,
            Self::GrantedQoS2 => 0x02,
            Self::UnspecifiedError => 0x80,
            Self::MalformedPacket => 0x81,
            Self::ProtocolError => 0x82,
            Self::UnsupportedProtocolVersion => 0x84,
            Self::ClientIdentifierNotValid => 0x85,
            Self::BadUserNameOrPassword => 0x86,
            Self::ServerUnavailable => 0x88,
            Self::ServerBusy => 0x89,
            Self::Banned => 0x8A,
            Self::PacketTooLarge => 0x95,
            Self::RetainNotSupported => 0x9A,
            Self::ConnectionRateExceeded => 0x9F,
            Self::Unknown(v) => v,
        }
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::GrantedQoS1 | Self::GrantedQoS2)
    }
}

impl From<ReasonCode> for u8 {
    fn from(rc: ReasonCode) -> Self {
        rc.code()
    }
}

impl TryFrom<u8> for ReasonCode {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0x00 => Self::Success,
            0x01 => Self::GrantedQoS1,
            0x02 => Self::GrantedQoS2,
            0x80 => Self::UnspecifiedError,
            0x81 => Self::MalformedPacket,
            0x82 => Self::ProtocolError,
            0x84 => Self::UnsupportedProtocolVersion,
            0x85 => Self::ClientIdentifierNotValid,
            0x86 => Self::BadUserNameOrPassword,
            0x88 => Self::ServerUnavailable,
            0x89 => Self::ServerBusy,
            0x8A => Self::Banned,
            0x95 => Self::PacketTooLarge,
            0x9A => Self::RetainNotSupported,
            0x9F => Self::ConnectionRateExceeded,
            other => Self::Unknown(other),
        })
    }
}
