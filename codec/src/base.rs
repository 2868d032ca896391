use std::convert::TryFrom;

use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};

/// Decode a packet, or a sub-field of one, from a byte cursor.
pub trait DecodePacket: Sized {
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the bytes do not form a valid instance of `Self`.
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError>;
}

/// Encode a packet, or a sub-field of one, onto a byte buffer.
pub trait EncodePacket {
    /// Appends the wire representation of `self` to `buf` and returns the
    /// number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if `self` cannot be represented on the wire,
    /// for example a string longer than 65535 bytes.
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError>;
}

/// A packet identifier assigned to packets that require acknowledgement
/// (`PUBLISH` with QoS > 0, `SUBSCRIBE`, `UNSUBSCRIBE`, and their acks).
pub type PacketId = u16;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum QoS {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl QoS {
    #[must_use]
    pub const fn min(self, other: Self) -> Self {
        if (self as u8) < (other as u8) {
            self
        } else {
            other
        }
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        qos as u8
    }
}

impl TryFrom<u8> for QoS {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            _ => Err(DecodeError::InvalidQoS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos_min() {
        assert_eq!(QoS::AtLeastOnce.min(QoS::ExactlyOnce), QoS::AtLeastOnce);
        assert_eq!(QoS::ExactlyOnce.min(QoS::AtMostOnce), QoS::AtMostOnce);
    }

    #[test]
    fn qos_round_trip() {
        for v in 0u8..=2 {
            let qos = QoS::try_from(v).unwrap();
            assert_eq!(u8::from(qos), v);
        }
        assert!(QoS::try_from(3).is_err());
    }
}
