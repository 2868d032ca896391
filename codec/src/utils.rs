/// Maximum client_id length this broker accepts. The MQTT5 spec only
/// mandates servers accept at least 23 bytes; this broker does not allow
/// more than that. Enforced by the broker's repository layer on CONNECT,
/// not by the codec.
pub const MAX_CLIENT_ID_LENGTH: usize = 23;
