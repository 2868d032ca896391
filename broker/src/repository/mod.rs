//! Persistent store abstraction. The real engine (a relational or
//! key/value store with ACID per-operation semantics) is out of scope; this
//! module defines the contract the broker core consumes and ships an
//! in-memory implementation that backs tests.

mod memory;

pub use memory::MemoryRepository;

use mqttbroker_codec::{PacketId, QoS};

use crate::error::Error;
use crate::types::{ClientId, Timestamp};

/// Fields of a CONNECT packet `store_client` needs to validate and persist.
/// Everything else in the CONNECT (properties, will) is handled by the
/// caller via [`Repository::save_will`].
#[derive(Clone, Debug)]
pub struct ConnectContext {
    pub client_id: ClientId,
    pub protocol_level: u8,
    pub username: Option<String>,
    pub password: Option<Vec<u8>>,
    pub keep_alive: u16,
    pub session_expiry: u32,
    pub packet_size: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectAckFlags {
    pub session_present: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
    pub packet_id: Option<PacketId>,
    pub published_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WillMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
    pub registered_at: Timestamp,
}

/// Persistent store abstraction for clients, users, topics, subscriptions,
/// messages, retained state and will messages. Every operation is
/// transactional and safe to call from multiple handler tasks at once.
pub trait Repository: Send + Sync {
    /// Validates and persists a CONNECT. Returns the ack flags and reason
    /// code to place on the outgoing CONNACK; a non-success reason code
    /// means the handler must close the connection after sending it.
    fn store_client(
        &self,
        ctx: &ConnectContext,
        now: Timestamp,
    ) -> Result<(ConnectAckFlags, mqttbroker_codec::ReasonCode), Error>;

    fn is_banned(&self, client_id: &str) -> Result<bool, Error>;

    fn mark_banned(&self, client_id: &str, banned: bool) -> Result<(), Error>;

    /// Upserts the qos for `(client_id, filter)` rather than inserting a
    /// duplicate row if the pair already exists.
    fn save_subscription(&self, client_id: &str, filter: &str, qos: QoS) -> Result<bool, Error>;

    fn remove_subscription(&self, client_id: &str, filter: &str) -> Result<bool, Error>;

    fn remove_all_subscriptions(&self, client_id: &str) -> Result<bool, Error>;

    /// Appends `message` and, if `message.retain` is set, updates (or
    /// clears, for an empty payload) the topic's retained slot.
    fn save_message(&self, message: &Message) -> Result<bool, Error>;

    fn save_will(&self, client_id: &str, will: &WillMessage) -> Result<(), Error>;

    fn retrieve_will(&self, client_id: &str) -> Result<Option<WillMessage>, Error>;

    fn remove_will(&self, client_id: &str) -> Result<(), Error>;

    fn update_disconnect_time(&self, client_id: &str, now: Timestamp) -> Result<(), Error>;

    fn retrieve_message_by_packet_id(&self, packet_id: PacketId) -> Result<Option<Message>, Error>;

    /// Connected clients whose subscription matches `topic_name`. Exact
    /// subscriptions compare equal; wildcard ones go through
    /// [`crate::matcher::matches`]. A client subscribed more than once to
    /// matching filters is collapsed to its maximum granted qos.
    fn get_subscribers(&self, topic_name: &str) -> Result<Vec<(ClientId, QoS)>, Error>;

    fn return_retained_for_filter(&self, filter: &str) -> Result<Vec<Message>, Error>;
}
