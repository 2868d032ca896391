pub use mqttbroker_codec::PacketId;

/// Clients are keyed by their MQTT client identifier everywhere in this
/// broker; there is no separate numeric session id.
pub type ClientId = String;

/// Seconds since `UNIX_EPOCH`, as stored by the Repository.
pub type Timestamp = u64;

/// Current wall-clock time as a [`Timestamp`].
#[must_use]
pub fn now_unix() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
