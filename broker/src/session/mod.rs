//! Per-connection protocol state machine.
//!
//! One task per accepted socket. `AwaitingConnect` accepts only CONNECT;
//! once it replies with a successful CONNACK the session moves to `Active`
//! and stays there handling PUBLISH/SUBSCRIBE/UNSUBSCRIBE/PINGREQ/acks until
//! DISCONNECT, a read timeout, or EOF tears it down.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use mqttbroker_codec::{
    ByteArray, ConnectAckPacket, ConnectPacket, DecodeError, DecodePacket, DisconnectPacket,
    EncodePacket, FixedHeader, Packet, PacketId, PingResponsePacket, Properties, PublishAckPacket,
    PublishCompletePacket, PublishPacket, PublishReceivedPacket, QoS, ReasonCode,
    SubscribeAckPacket, UnsubscribeAckPacket,
};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::constants::KEEP_ALIVE_GRACE;
use crate::dispatcher::{Dispatcher, DispatchWork};
use crate::error::{Error, ErrorKind};
use crate::registry::{Connection, Registry};
use crate::repository::{ConnectContext, Message, Repository, WillMessage};
use crate::types::{now_unix, ClientId};

#[derive(Debug, PartialEq, Eq)]
enum State {
    AwaitingConnect,
    Active,
    Closed,
}

/// Runs a single client connection to completion. Consumes the accepted
/// socket; returns once the connection has been fully torn down.
pub async fn run(
    stream: TcpStream,
    repository: Arc<dyn Repository>,
    registry: Registry,
    dispatcher: Dispatcher,
) {
    let peer = stream.peer_addr().ok();
    let (mut read_half, write_half) = stream.into_split();
    let connection = Connection::new(write_half);

    let mut session = Session {
        client_id: String::new(),
        clean_session: true,
        keep_alive: 0,
        state: State::AwaitingConnect,
        connection,
        repository,
        registry,
        dispatcher,
        completed_qos2: HashSet::new(),
    };

    let mut buf = Vec::with_capacity(512);
    loop {
        let read_deadline = session.read_deadline();
        let read = match read_deadline {
            Some(d) => match timeout(d, read_half.read_buf(&mut buf)).await {
                Ok(r) => r,
                Err(_) => {
                    debug!("session {:?}: keep-alive timeout", session.client_id);
                    break;
                }
            },
            None => read_half.read_buf(&mut buf).await,
        };

        match read {
            Ok(0) => {
                debug!("session {:?}: peer {:?} closed", session.client_id, peer);
                break;
            }
            Ok(_) => {
                if let Err(e) = session.drain_buffer(&mut buf).await {
                    warn!("session {:?}: {e}", session.client_id);
                    break;
                }
                if session.state == State::Closed {
                    break;
                }
            }
            Err(e) => {
                warn!("session {:?}: read error: {e}", session.client_id);
                break;
            }
        }
    }

    session.teardown().await;
}

struct Session {
    client_id: ClientId,
    clean_session: bool,
    keep_alive: u16,
    state: State,
    connection: Connection,
    repository: Arc<dyn Repository>,
    registry: Registry,
    dispatcher: Dispatcher,
    /// QoS2 packet_ids this session has already delivered a PUBCOMP for, so
    /// a retransmitted PUBREL doesn't enqueue the stored message twice.
    completed_qos2: HashSet<PacketId>,
}

impl Session {
    fn read_deadline(&self) -> Option<Duration> {
        if self.state == State::Active && self.keep_alive > 0 {
            Some(Duration::from_secs_f32(
                f32::from(self.keep_alive) * KEEP_ALIVE_GRACE,
            ))
        } else {
            None
        }
    }

    /// Decodes and processes every complete packet currently in `buf`,
    /// leaving any trailing partial packet for the next read.
    async fn drain_buffer(&mut self, buf: &mut Vec<u8>) -> Result<(), Error> {
        loop {
            let consumed = match peek_packet_len(buf) {
                Ok(Some(len)) => len,
                Ok(None) => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            let packet = Packet::decode(&buf[..consumed])?;
            buf.drain(..consumed);
            self.handle_packet(packet).await?;
            if self.state == State::Closed {
                return Ok(());
            }
        }
    }

    async fn send<P: EncodePacket>(&self, packet: &P) -> Result<(), Error> {
        let mut out = Vec::new();
        packet.encode(&mut out)?;
        self.connection.send(&out).await.map_err(Error::from)
    }

    async fn handle_packet(&mut self, packet: Packet) -> Result<(), Error> {
        if self.state == State::AwaitingConnect {
            return match packet {
                Packet::Connect(connect) => self.on_connect(connect).await,
                other => {
                    warn!("protocol violation: {other:?} before CONNECT");
                    self.state = State::Closed;
                    Err(Error::new(
                        ErrorKind::ProtocolViolation,
                        "packet received before CONNECT",
                    ))
                }
            };
        }

        match packet {
            Packet::Publish(publish) => self.on_publish(publish).await,
            Packet::PublishAck(ack) => self.on_publish_ack(ack.packet_id).await,
            Packet::PublishReceived(rec) => self.on_publish_received(rec.packet_id).await,
            Packet::PublishRelease(rel) => self.on_publish_release(rel.packet_id).await,
            Packet::PublishComplete(comp) => self.on_publish_complete(comp.packet_id).await,
            Packet::Subscribe(subscribe) => self.on_subscribe(subscribe).await,
            Packet::Unsubscribe(unsubscribe) => self.on_unsubscribe(unsubscribe).await,
            Packet::PingRequest(_) => self.send(&PingResponsePacket).await,
            Packet::Disconnect(_) => self.on_disconnect().await,
            Packet::Connect(_) => {
                warn!("protocol violation: second CONNECT from {}", self.client_id);
                self.state = State::Closed;
                Err(Error::new(ErrorKind::ProtocolViolation, "duplicate CONNECT"))
            }
            other => {
                debug!("session {}: unhandled packet {other:?}", self.client_id);
                Ok(())
            }
        }
    }

    async fn on_connect(&mut self, packet: ConnectPacket) -> Result<(), Error> {
        let ctx = ConnectContext {
            client_id: packet.client_id.clone(),
            protocol_level: packet.protocol_level,
            username: packet.username.clone(),
            password: packet.password.clone(),
            keep_alive: packet.keep_alive,
            session_expiry: 0,
            packet_size: packet_size(&packet),
        };
        let (ack_flags, reason_code) = self.repository.store_client(&ctx, now_unix())?;

        if reason_code == ReasonCode::Success {
            self.client_id = packet.client_id.clone();
            self.clean_session = packet.clean_session;
            self.keep_alive = packet.keep_alive;

            if let Some(will) = &packet.will {
                let will_message = WillMessage {
                    topic: will.topic.clone(),
                    payload: will.payload.clone(),
                    qos: will.qos,
                    retain: will.retain,
                    registered_at: now_unix(),
                };
                self.repository.save_will(&self.client_id, &will_message)?;
            }

            self.registry
                .register(self.client_id.clone(), self.connection.clone())
                .await;

            let reply = ConnectAckPacket::success(ack_flags.session_present);
            self.send(&reply).await?;
            self.state = State::Active;
            info!("session: {} connected", self.client_id);
        } else {
            let reply = ConnectAckPacket::failure(reason_code);
            self.send(&reply).await?;
            self.state = State::Closed;
            warn!("session: CONNECT refused, reason={reason_code:?}");
        }
        Ok(())
    }

    async fn on_publish(&mut self, packet: PublishPacket) -> Result<(), Error> {
        let message = Message {
            topic: packet.topic.clone(),
            payload: packet.payload.clone(),
            qos: packet.qos,
            retain: packet.retain,
            packet_id: packet.packet_id,
            published_at: now_unix(),
        };

        match packet.qos {
            QoS::AtMostOnce => {
                self.repository.save_message(&message)?;
                self.dispatch(message).await;
            }
            QoS::AtLeastOnce => {
                self.repository.save_message(&message)?;
                if let Some(packet_id) = packet.packet_id {
                    self.send(&PublishAckPacket {
                        packet_id,
                        reason_code: ReasonCode::Success,
                        properties: Properties::default(),
                    })
                    .await?;
                }
                self.dispatch(message).await;
            }
            QoS::ExactlyOnce => {
                self.repository.save_message(&message)?;
                if let Some(packet_id) = packet.packet_id {
                    self.send(&PublishReceivedPacket {
                        packet_id,
                        reason_code: ReasonCode::Success,
                        properties: Properties::default(),
                    })
                    .await?;
                }
            }
        }
        Ok(())
    }

    async fn on_publish_release(&mut self, packet_id: PacketId) -> Result<(), Error> {
        if self.completed_qos2.insert(packet_id) {
            if let Some(message) = self.repository.retrieve_message_by_packet_id(packet_id)? {
                self.dispatch(message).await;
            }
        }
        self.send(&PublishCompletePacket {
            packet_id,
            reason_code: ReasonCode::Success,
            properties: Properties::default(),
        })
        .await
    }

    async fn on_publish_ack(&mut self, packet_id: PacketId) -> Result<(), Error> {
        self.dispatcher.pending_acks().signal(&self.client_id, packet_id);
        Ok(())
    }

    async fn on_publish_received(&mut self, packet_id: PacketId) -> Result<(), Error> {
        self.dispatcher.pending_acks().signal(&self.client_id, packet_id);
        Ok(())
    }

    async fn on_publish_complete(&mut self, packet_id: PacketId) -> Result<(), Error> {
        self.dispatcher.pending_acks().signal(&self.client_id, packet_id);
        Ok(())
    }

    async fn on_subscribe(&mut self, packet: mqttbroker_codec::SubscribePacket) -> Result<(), Error> {
        let mut reason_codes = Vec::with_capacity(packet.topics.len());
        let mut granted = Vec::with_capacity(packet.topics.len());
        for topic in &packet.topics {
            match self
                .repository
                .save_subscription(&self.client_id, &topic.filter, topic.qos)
            {
                Ok(_) => {
                    reason_codes.push(match topic.qos {
                        QoS::AtMostOnce => ReasonCode::Success,
                        QoS::AtLeastOnce => ReasonCode::GrantedQoS1,
                        QoS::ExactlyOnce => ReasonCode::GrantedQoS2,
                    });
                    granted.push((topic.filter.clone(), topic.qos));
                }
                Err(e) => {
                    error!("save_subscription failed: {e}");
                    reason_codes.push(ReasonCode::UnspecifiedError);
                }
            }
        }

        self.send(&SubscribeAckPacket {
            packet_id: packet.packet_id,
            properties: Properties::default(),
            reason_codes,
        })
        .await?;

        for (filter, qos) in granted {
            let retained = self.repository.return_retained_for_filter(&filter)?;
            for message in retained {
                let work = DispatchWork::retained_replay(message, self.client_id.clone(), qos);
                if let Err(e) = self.dispatcher.dispatch(work).await {
                    warn!("retained replay dispatch failed: {e}");
                }
            }
        }
        Ok(())
    }

    async fn on_unsubscribe(
        &mut self,
        packet: mqttbroker_codec::UnsubscribePacket,
    ) -> Result<(), Error> {
        for filter in &packet.filters {
            self.repository.remove_subscription(&self.client_id, filter)?;
        }
        self.send(&UnsubscribeAckPacket {
            packet_id: packet.packet_id,
            properties: Properties::default(),
        })
        .await
    }

    async fn on_disconnect(&mut self) -> Result<(), Error> {
        if self.clean_session {
            self.repository.remove_all_subscriptions(&self.client_id)?;
        }
        self.repository
            .update_disconnect_time(&self.client_id, now_unix())?;
        self.registry.deregister(&self.client_id).await;
        self.state = State::Closed;
        let _ = self
            .send(&DisconnectPacket {
                reason_code: ReasonCode::Success,
            })
            .await;
        Ok(())
    }

    async fn dispatch(&self, message: Message) {
        if let Err(e) = self.dispatcher.dispatch(DispatchWork::fan_out(message)).await {
            warn!("dispatch failed: {e}");
        }
    }

    /// Abnormal teardown: dispatches the will (if any) and always updates
    /// disconnect bookkeeping. Never runs for a clean DISCONNECT, which
    /// already handled its own teardown and set `state = Closed` itself.
    async fn teardown(&mut self) {
        if self.client_id.is_empty() {
            return;
        }
        if self.state != State::Closed {
            if let Ok(Some(will)) = self.repository.retrieve_will(&self.client_id) {
                let message = Message {
                    topic: will.topic,
                    payload: will.payload,
                    qos: will.qos,
                    retain: will.retain,
                    packet_id: None,
                    published_at: now_unix(),
                };
                if self.repository.save_message(&message).is_ok() {
                    self.dispatch(message).await;
                }
                let _ = self.repository.remove_will(&self.client_id);
            }
            if self.clean_session {
                let _ = self.repository.remove_all_subscriptions(&self.client_id);
            }
        }
        let _ = self
            .repository
            .update_disconnect_time(&self.client_id, now_unix());
        self.registry.deregister(&self.client_id).await;
    }
}

fn packet_size(packet: &ConnectPacket) -> usize {
    let mut buf = Vec::new();
    let _ = packet.encode(&mut buf);
    buf.len()
}

/// Returns the total byte length of the next complete packet in `buf`, or
/// `None` if `buf` doesn't yet hold a full fixed header plus its payload.
fn peek_packet_len(buf: &[u8]) -> Result<Option<usize>, DecodeError> {
    if buf.is_empty() {
        return Ok(None);
    }
    let mut ba = ByteArray::new(buf);
    let fixed_header = match FixedHeader::decode(&mut ba) {
        Ok(h) => h,
        Err(DecodeError::OutOfRange) => return Ok(None),
        Err(e) => return Err(e),
    };
    let total = fixed_header.bytes() + fixed_header.remaining_length();
    if total > buf.len() {
        Ok(None)
    } else {
        Ok(Some(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use mqttbroker_codec::ConnectPacket;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    async fn spawn_broker() -> (
        std::net::SocketAddr,
        Arc<dyn Repository>,
        Registry,
        Dispatcher,
        Vec<tokio::task::JoinHandle<()>>,
    ) {
        let repository: Arc<dyn Repository> = Arc::new(MemoryRepository::default());
        let registry = Registry::new();
        let (dispatcher, workers) = Dispatcher::spawn(Arc::clone(&repository), registry.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let repo = Arc::clone(&repository);
        let reg = registry.clone();
        let disp = dispatcher.clone();
        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                run(stream, repo, reg, disp).await;
            }
        });
        (addr, repository, registry, dispatcher, workers)
    }

    #[tokio::test]
    async fn connect_then_ping() {
        let (addr, _repository, registry, dispatcher, workers) = spawn_broker().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let connect = ConnectPacket {
            protocol_level: 5,
            clean_session: true,
            keep_alive: 60,
            properties: Properties::default(),
            client_id: "c1".to_string(),
            will: None,
            username: None,
            password: None,
        };
        let mut buf = Vec::new();
        connect.encode(&mut buf).unwrap();
        client.write_all(&buf).await.unwrap();

        let mut resp = [0u8; 16];
        let n = client.read(&mut resp).await.unwrap();
        assert!(n >= 4);
        assert_eq!(resp[0], 0x20);
        assert_eq!(resp[2], 0x00, "connect ack flags");
        assert_eq!(resp[3], 0x00, "reason code success");

        client.write_all(&[0xC0, 0x00]).await.unwrap();
        let mut ping_resp = [0u8; 2];
        client.read_exact(&mut ping_resp).await.unwrap();
        assert_eq!(ping_resp, [0xD0, 0x00]);

        assert!(registry.is_connected("c1").await);
        dispatcher.shutdown(workers).await;
    }
}
