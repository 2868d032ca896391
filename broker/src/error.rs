use std::fmt;
use std::io;

use mqttbroker_codec::ReasonCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Decode failure or a field combination the codec rejects outright.
    MalformedPacket,

    /// A packet arrived that is not legal in the session's current state
    /// (PUBLISH before CONNECT, a second CONNECT, ...).
    ProtocolViolation,

    /// Username/password did not match a stored user row.
    AuthenticationFailure,

    /// Repository or listener cannot currently accept new sessions.
    ServerUnavailable,

    /// `MAX_CONNECTIONS` connected clients already.
    Busy,

    /// This client_id reconnected faster than `MIN_CONNECTION_INTERVAL_SECS`.
    RateLimited,

    /// Client's `banned` flag is set.
    ClientBanned,

    /// client_id failed length validation.
    ClientIdInvalid,

    /// CONNECT exceeded `MAX_PACKET_SIZE`.
    PacketTooLarge,

    /// protocol_level was not 5.
    UnsupportedProtocol,

    /// A Repository operation failed.
    StorageError,

    /// A dispatcher ack wait expired.
    AckTimeout,

    /// The underlying socket or channel failed.
    NetworkError,
}

impl ErrorKind {
    /// CONNACK reason code this kind maps to, where applicable.
    #[must_use]
    pub const fn reason_code(self) -> Option<ReasonCode> {
        match self {
            Self::AuthenticationFailure => Some(ReasonCode::BadUserNameOrPassword),
            Self::ServerUnavailable => Some(ReasonCode::ServerUnavailable),
            Self::Busy => Some(ReasonCode::ServerBusy),
            Self::RateLimited => Some(ReasonCode::ConnectionRateExceeded),
            Self::ClientBanned => Some(ReasonCode::Banned),
            Self::ClientIdInvalid => Some(ReasonCode::ClientIdentifierNotValid),
            Self::PacketTooLarge => Some(ReasonCode::PacketTooLarge),
            Self::UnsupportedProtocol => Some(ReasonCode::UnspecifiedError),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::new(ErrorKind::NetworkError, &e.to_string())
    }
}

impl From<mqttbroker_codec::DecodeError> for Error {
    fn from(e: mqttbroker_codec::DecodeError) -> Self {
        Self::new(ErrorKind::MalformedPacket, &e.to_string())
    }
}

impl From<mqttbroker_codec::EncodeError> for Error {
    fn from(e: mqttbroker_codec::EncodeError) -> Self {
        Self::new(ErrorKind::MalformedPacket, &e.to_string())
    }
}

macro_rules! convert_send_error {
    ($cmd_type:ty) => {
        impl From<tokio::sync::mpsc::error::SendError<$cmd_type>> for Error {
            fn from(e: tokio::sync::mpsc::error::SendError<$cmd_type>) -> Self {
                Self::new(ErrorKind::NetworkError, &e.to_string())
            }
        }
    };
}

convert_send_error!(crate::dispatcher::DispatchWork);
