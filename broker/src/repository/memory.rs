use std::collections::HashMap;
use std::sync::Mutex;

use mqttbroker_codec::{PacketId, QoS, ReasonCode};
use sha2::{Digest, Sha256};

use super::{ConnectAckFlags, ConnectContext, Message, Repository, WillMessage};
use crate::constants;
use crate::error::Error;
use crate::types::{ClientId, Timestamp};

struct ClientRecord {
    username: Option<String>,
    banned: bool,
    connected: bool,
    keep_alive: u16,
    session_expiry: u32,
    last_seen: Timestamp,
}

#[derive(Default)]
struct TopicRecord {
    retained_payload: Option<Vec<u8>>,
    retained_qos: QoS,
    retained_timestamp: Timestamp,
}

struct State {
    clients: HashMap<ClientId, ClientRecord>,
    users: HashMap<String, String>,
    topics: HashMap<String, TopicRecord>,
    subscriptions: HashMap<(ClientId, String), QoS>,
    wills: HashMap<ClientId, WillMessage>,
    qos2_inbound: HashMap<PacketId, Message>,
}

/// In-memory [`Repository`] implementation. Serializes all access behind a
/// single mutex; adequate for tests and small deployments, not meant to
/// survive process restarts.
pub struct MemoryRepository {
    state: Mutex<State>,
    max_connections: usize,
    min_connection_interval_secs: u64,
    max_client_id_length: usize,
}

impl MemoryRepository {
    #[must_use]
    pub fn new(max_connections: usize, min_connection_interval_secs: u64) -> Self {
        Self::with_max_client_id_length(
            max_connections,
            min_connection_interval_secs,
            constants::MAX_CLIENT_ID_LENGTH,
        )
    }

    #[must_use]
    pub fn with_max_client_id_length(
        max_connections: usize,
        min_connection_interval_secs: u64,
        max_client_id_length: usize,
    ) -> Self {
        Self {
            state: Mutex::new(State {
                clients: HashMap::new(),
                users: HashMap::new(),
                topics: HashMap::new(),
                subscriptions: HashMap::new(),
                wills: HashMap::new(),
                qos2_inbound: HashMap::new(),
            }),
            max_connections,
            min_connection_interval_secs,
            max_client_id_length,
        }
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new(
            constants::MAX_CONNECTIONS,
            constants::MIN_CONNECTION_INTERVAL_SECS,
        )
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

impl Repository for MemoryRepository {
    fn store_client(
        &self,
        ctx: &ConnectContext,
        now: Timestamp,
    ) -> Result<(ConnectAckFlags, ReasonCode), Error> {
        if ctx.packet_size > constants::MAX_PACKET_SIZE {
            return Ok((ConnectAckFlags::default(), ReasonCode::PacketTooLarge));
        }
        if ctx.protocol_level != constants::SUPPORTED_PROTOCOL_LEVEL {
            return Ok((
                ConnectAckFlags::default(),
                ReasonCode::UnsupportedProtocolVersion,
            ));
        }

        let mut state = self.state.lock().expect("repository mutex poisoned");

        let active = state.clients.values().filter(|c| c.connected).count();
        if active >= self.max_connections {
            return Ok((ConnectAckFlags::default(), ReasonCode::ServerBusy));
        }

        if let Some(existing) = state.clients.get(&ctx.client_id) {
            if existing.banned {
                return Ok((ConnectAckFlags::default(), ReasonCode::Banned));
            }
            let elapsed = now.saturating_sub(existing.last_seen);
            if elapsed < self.min_connection_interval_secs {
                return Ok((
                    ConnectAckFlags::default(),
                    ReasonCode::ConnectionRateExceeded,
                ));
            }
        }

        if ctx.client_id.is_empty() || ctx.client_id.len() > self.max_client_id_length {
            return Ok((
                ConnectAckFlags::default(),
                ReasonCode::ClientIdentifierNotValid,
            ));
        }

        if let Some(username) = &ctx.username {
            let provided_hash = ctx.password.as_deref().map(sha256_hex);
            match (state.users.get(username), provided_hash) {
                (Some(stored), Some(provided)) if *stored == provided => {}
                (None, Some(provided)) => {
                    state.users.insert(username.clone(), provided);
                }
                _ => {
                    return Ok((ConnectAckFlags::default(), ReasonCode::BadUserNameOrPassword));
                }
            }
        }

        state.clients.insert(
            ctx.client_id.clone(),
            ClientRecord {
                username: ctx.username.clone(),
                banned: false,
                connected: true,
                keep_alive: ctx.keep_alive,
                session_expiry: ctx.session_expiry,
                last_seen: now,
            },
        );

        Ok((ConnectAckFlags::default(), ReasonCode::Success))
    }

    fn is_banned(&self, client_id: &str) -> Result<bool, Error> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state
            .clients
            .get(client_id)
            .map(|c| c.banned)
            .unwrap_or(false))
    }

    fn mark_banned(&self, client_id: &str, banned: bool) -> Result<(), Error> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if let Some(client) = state.clients.get_mut(client_id) {
            client.banned = banned;
        }
        Ok(())
    }

    fn save_subscription(&self, client_id: &str, filter: &str, qos: QoS) -> Result<bool, Error> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if !filter.contains('+') && !filter.contains('#') {
            state
                .topics
                .entry(filter.to_string())
                .or_insert_with(TopicRecord::default);
        }
        state
            .subscriptions
            .insert((client_id.to_string(), filter.to_string()), qos);
        Ok(true)
    }

    fn remove_subscription(&self, client_id: &str, filter: &str) -> Result<bool, Error> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        Ok(state
            .subscriptions
            .remove(&(client_id.to_string(), filter.to_string()))
            .is_some())
    }

    fn remove_all_subscriptions(&self, client_id: &str) -> Result<bool, Error> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        let before = state.subscriptions.len();
        state.subscriptions.retain(|(c, _), _| c != client_id);
        Ok(state.subscriptions.len() != before)
    }

    fn save_message(&self, message: &Message) -> Result<bool, Error> {
        let mut state = self.state.lock().expect("repository mutex poisoned");

        if message.retain {
            let entry = state
                .topics
                .entry(message.topic.clone())
                .or_insert_with(TopicRecord::default);
            if message.payload.is_empty() {
                entry.retained_payload = None;
            } else {
                entry.retained_payload = Some(message.payload.clone());
                entry.retained_qos = message.qos;
                entry.retained_timestamp = message.published_at;
            }
        } else {
            state
                .topics
                .entry(message.topic.clone())
                .or_insert_with(TopicRecord::default);
        }

        if message.qos == QoS::ExactlyOnce {
            if let Some(packet_id) = message.packet_id {
                state.qos2_inbound.insert(packet_id, message.clone());
            }
        }

        Ok(true)
    }

    fn save_will(&self, client_id: &str, will: &WillMessage) -> Result<(), Error> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        state.wills.insert(client_id.to_string(), will.clone());
        Ok(())
    }

    fn retrieve_will(&self, client_id: &str) -> Result<Option<WillMessage>, Error> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.wills.get(client_id).cloned())
    }

    fn remove_will(&self, client_id: &str) -> Result<(), Error> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        state.wills.remove(client_id);
        Ok(())
    }

    fn update_disconnect_time(&self, client_id: &str, now: Timestamp) -> Result<(), Error> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if let Some(client) = state.clients.get_mut(client_id) {
            client.connected = false;
            client.last_seen = now;
        }
        Ok(())
    }

    fn retrieve_message_by_packet_id(&self, packet_id: PacketId) -> Result<Option<Message>, Error> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.qos2_inbound.remove(&packet_id))
    }

    fn get_subscribers(&self, topic_name_str: &str) -> Result<Vec<(ClientId, QoS)>, Error> {
        let state = self.state.lock().expect("repository mutex poisoned");
        let mut best: HashMap<ClientId, QoS> = HashMap::new();
        for ((client_id, filter), qos) in &state.subscriptions {
            let is_match = if filter.contains('+') || filter.contains('#') {
                crate::matcher::matches(filter, topic_name_str)
            } else {
                filter == topic_name_str
            };
            if !is_match {
                continue;
            }
            if !state
                .clients
                .get(client_id)
                .map(|c| c.connected)
                .unwrap_or(false)
            {
                continue;
            }
            let current = best.entry(client_id.clone()).or_insert(*qos);
            if (*qos as u8) > (*current as u8) {
                *current = *qos;
            }
        }
        Ok(best.into_iter().collect())
    }

    fn return_retained_for_filter(&self, filter: &str) -> Result<Vec<Message>, Error> {
        let state = self.state.lock().expect("repository mutex poisoned");
        let mut out = Vec::new();
        for (path, topic) in &state.topics {
            let Some(payload) = &topic.retained_payload else {
                continue;
            };
            let is_match = if filter.contains('+') || filter.contains('#') {
                crate::matcher::matches(filter, path)
            } else {
                filter == path
            };
            if is_match {
                out.push(Message {
                    topic: path.clone(),
                    payload: payload.clone(),
                    qos: topic.retained_qos,
                    retain: true,
                    packet_id: None,
                    published_at: topic.retained_timestamp,
                });
            }
        }
        Ok(out)
    }
}
