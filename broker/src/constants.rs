//! Tunables with a fixed default, overridable via [`crate::config::Config`].

/// Default path looked up when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "/etc/mqttbroker/mqttbroker.toml";

/// Capacity of the bounded channels handlers and the dispatcher communicate
/// over.
pub const CHANNEL_CAPACITY: usize = 16;

/// Clients allowed to be simultaneously `connected=true` before CONNECT is
/// refused with `ServerBusy`.
pub const MAX_CONNECTIONS: usize = 65536;

/// A CONNECT from a client_id whose `last_seen` is within this many seconds
/// is refused with `ConnectionRateExceeded`.
pub const MIN_CONNECTION_INTERVAL_SECS: u64 = 1;

/// MQTT5 only guarantees servers accept client ids up to this length.
pub const MAX_CLIENT_ID_LENGTH: usize = mqttbroker_codec::MAX_CLIENT_ID_LENGTH;

/// Only protocol_level 5 (MQTT5) is accepted; anything else is refused with
/// `UnsupportedProtocolVersion`.
pub const SUPPORTED_PROTOCOL_LEVEL: u8 = 5;

/// Largest CONNECT packet this broker accepts before refusing the
/// connection, expressed in bytes on the wire.
pub const MAX_PACKET_SIZE: usize = 268_435_456;

/// Dispatcher worker pool size.
pub const DISPATCHER_WORKERS: usize = 5;

/// How long a dispatcher worker waits for PUBACK/PUBREC/PUBCOMP before
/// giving up on a single delivery attempt.
pub const ACK_TIMEOUT_SECS: u64 = 5;

/// Handler read deadline is `keep_alive * KEEP_ALIVE_GRACE`.
pub const KEEP_ALIVE_GRACE: f32 = 1.5;

/// Default bind address when neither config nor CLI specify one.
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// TCP listen backlog.
pub const LISTEN_BACKLOG: u32 = 50;
