//! Concurrent fan-out from a published [`Message`](crate::repository::Message)
//! to every matching subscriber, with QoS1/QoS2 acknowledgment handshakes.
//!
//! A bounded worker pool pulls work items off a shared queue, one per
//! published message. Each worker resolves the subscriber list itself (or,
//! for a retained-on-subscribe replay, targets a single client) and sends
//! one PUBLISH per subscriber, waiting out that subscriber's ack flow before
//! moving to the next item. Workers never block each other: the only shared
//! mutable state is the queue and the [`PendingAcks`] table.

mod pending_acks;

pub use pending_acks::PendingAcks;

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use log::{debug, trace, warn};
use mqttbroker_codec::{EncodePacket, PacketId, PublishPacket, PublishReleasePacket, QoS};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::constants::{ACK_TIMEOUT_SECS, CHANNEL_CAPACITY, DISPATCHER_WORKERS};
use crate::registry::Registry;
use crate::repository::{Message, Repository};
use crate::types::ClientId;

/// Which client(s) a queued [`Message`] should be fanned out to.
#[derive(Clone, Debug)]
pub enum DispatchTarget {
    /// Resolve subscribers from the repository at send time.
    AllSubscribers,
    /// A single client, at the granted qos it subscribed with. Used for
    /// retained-message replay on SUBACK, which bypasses normal fan-out.
    Single { client_id: ClientId, granted_qos: QoS },
}

/// One unit of work on the dispatcher's queue.
#[derive(Clone, Debug)]
pub struct DispatchWork {
    pub message: Message,
    pub target: DispatchTarget,
    /// Whether the PUBLISH sent to subscribers carries the retain flag.
    /// Normal fan-out always clears it on the wire; retained replay keeps
    /// it set so a fresh subscriber can tell this was a retained message.
    pub retain_on_wire: bool,
}

impl DispatchWork {
    #[must_use]
    pub fn fan_out(message: Message) -> Self {
        let retain = message.retain;
        Self {
            message,
            target: DispatchTarget::AllSubscribers,
            retain_on_wire: retain,
        }
    }

    #[must_use]
    pub fn retained_replay(message: Message, client_id: ClientId, granted_qos: QoS) -> Self {
        Self {
            message,
            target: DispatchTarget::Single {
                client_id,
                granted_qos,
            },
            retain_on_wire: true,
        }
    }
}

/// Shared dispatcher handle. Cloning shares the same queue and ack table;
/// each clone can enqueue work, only the owner that called [`Dispatcher::spawn`]
/// holds the worker `JoinHandle`s.
#[derive(Clone)]
pub struct Dispatcher {
    queue_tx: mpsc::Sender<DispatchWork>,
    pending_acks: PendingAcks,
    packet_id_counter: Arc<AtomicU16>,
}

impl Dispatcher {
    /// Spawns [`DISPATCHER_WORKERS`] worker tasks with the default
    /// [`ACK_TIMEOUT_SECS`] ack wait. See [`Dispatcher::spawn_with`] to
    /// override either from [`crate::config::DispatcherConfig`].
    #[must_use]
    pub fn spawn(
        repository: Arc<dyn Repository>,
        registry: Registry,
    ) -> (Self, Vec<JoinHandle<()>>) {
        Self::spawn_with(repository, registry, DISPATCHER_WORKERS, ACK_TIMEOUT_SECS)
    }

    /// Spawns `worker_count` worker tasks pulling from a fresh bounded
    /// queue, each waiting up to `ack_timeout_secs` for a subscriber's ack,
    /// and returns the handle plus their join handles so the caller can
    /// await a graceful [`shutdown`](Dispatcher::shutdown).
    #[must_use]
    pub fn spawn_with(
        repository: Arc<dyn Repository>,
        registry: Registry,
        worker_count: usize,
        ack_timeout_secs: u64,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (queue_tx, queue_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let queue_rx = Arc::new(Mutex::new(queue_rx));
        let pending_acks = PendingAcks::new();
        let packet_id_counter = Arc::new(AtomicU16::new(0));

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let queue_rx = Arc::clone(&queue_rx);
            let repository = Arc::clone(&repository);
            let registry = registry.clone();
            let pending_acks = pending_acks.clone();
            let packet_id_counter = Arc::clone(&packet_id_counter);
            workers.push(tokio::spawn(async move {
                worker_loop(
                    worker_id,
                    queue_rx,
                    repository,
                    registry,
                    pending_acks,
                    packet_id_counter,
                    ack_timeout_secs,
                )
                .await;
            }));
        }

        (
            Self {
                queue_tx,
                pending_acks,
                packet_id_counter,
            },
            workers,
        )
    }

    /// Enqueues a message for fan-out. Blocks if the queue is full, which
    /// back-pressures the caller's handler task rather than the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns an error if every worker has already shut down.
    pub async fn dispatch(&self, work: DispatchWork) -> Result<(), crate::error::Error> {
        self.queue_tx.send(work).await?;
        Ok(())
    }

    /// The table session handlers signal on receiving PUBACK/PUBREC/PUBCOMP.
    #[must_use]
    pub fn pending_acks(&self) -> &PendingAcks {
        &self.pending_acks
    }

    /// Stops accepting new work; queued and in-flight work items still
    /// drain since workers hold their own queue handle until their current
    /// send completes.
    pub fn shutdown(self, workers: Vec<JoinHandle<()>>) -> impl std::future::Future<Output = ()> {
        drop(self.queue_tx);
        async move {
            for worker in workers {
                let _ = worker.await;
            }
        }
    }
}

fn next_packet_id(counter: &AtomicU16) -> PacketId {
    loop {
        let next = counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if next != 0 {
            return next;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue_rx: Arc<Mutex<mpsc::Receiver<DispatchWork>>>,
    repository: Arc<dyn Repository>,
    registry: Registry,
    pending_acks: PendingAcks,
    packet_id_counter: Arc<AtomicU16>,
    ack_timeout_secs: u64,
) {
    loop {
        let work = {
            let mut queue_rx = queue_rx.lock().await;
            queue_rx.recv().await
        };
        let Some(work) = work else {
            debug!("dispatcher worker {worker_id} stopping, queue closed");
            return;
        };

        let targets = match resolve_targets(&work, repository.as_ref()) {
            Ok(targets) => targets,
            Err(e) => {
                warn!("dispatcher worker {worker_id} failed to resolve subscribers: {e}");
                continue;
            }
        };

        for (client_id, subscriber_qos) in targets {
            let Some(connection) = registry.get(&client_id).await else {
                continue;
            };
            // Held for the whole send-then-ack-wait sequence below, not just
            // the write, so a second worker delivering a different message
            // to this same subscriber can't interleave its own send/ack
            // steps into the middle of this one.
            let _delivery_guard = connection.lock_delivery().await;
            let effective_qos = work.message.qos.min(subscriber_qos);
            let packet_id = if effective_qos == QoS::AtMostOnce {
                None
            } else {
                Some(next_packet_id(&packet_id_counter))
            };

            let publish = PublishPacket {
                dup: false,
                qos: effective_qos,
                retain: work.retain_on_wire,
                topic: work.message.topic.clone(),
                packet_id,
                properties: mqttbroker_codec::Properties::default(),
                payload: work.message.payload.clone(),
            };
            let mut buf = Vec::new();
            if let Err(e) = publish.encode(&mut buf) {
                warn!("dispatcher worker {worker_id} failed to encode PUBLISH: {e}");
                continue;
            }
            if connection.send(&buf).await.is_err() {
                continue;
            }

            match (effective_qos, packet_id) {
                (QoS::AtMostOnce, _) => {}
                (QoS::AtLeastOnce, Some(packet_id)) => {
                    await_ack(&pending_acks, &client_id, packet_id, ack_timeout_secs).await;
                }
                (QoS::ExactlyOnce, Some(packet_id)) => {
                    if await_ack(&pending_acks, &client_id, packet_id, ack_timeout_secs).await {
                        let pubrel = PublishReleasePacket { packet_id };
                        let mut rel_buf = Vec::new();
                        if pubrel.encode(&mut rel_buf).is_ok()
                            && connection.send(&rel_buf).await.is_ok()
                        {
                            await_ack(&pending_acks, &client_id, packet_id, ack_timeout_secs).await;
                        }
                    }
                }
                (_, None) => {
                    warn!("dispatcher worker {worker_id} qos>0 delivery missing packet_id");
                }
            }
        }
    }
}

/// Waits for the ack registered at `(client_id, packet_id)`, giving up
/// after `ack_timeout_secs`. Returns whether the ack arrived.
async fn await_ack(
    pending_acks: &PendingAcks,
    client_id: &str,
    packet_id: PacketId,
    ack_timeout_secs: u64,
) -> bool {
    let rx = pending_acks.register(client_id, packet_id);
    let outcome = tokio::time::timeout(Duration::from_secs(ack_timeout_secs), rx).await;
    match outcome {
        Ok(Ok(())) => true,
        Ok(Err(_)) => false,
        Err(_) => {
            trace!("ack wait for {client_id}/{packet_id} timed out");
            pending_acks.cancel(client_id, packet_id);
            false
        }
    }
}

fn resolve_targets(
    work: &DispatchWork,
    repository: &dyn Repository,
) -> Result<Vec<(ClientId, QoS)>, crate::error::Error> {
    match &work.target {
        DispatchTarget::AllSubscribers => repository.get_subscribers(&work.message.topic),
        DispatchTarget::Single {
            client_id,
            granted_qos,
        } => Ok(vec![(client_id.clone(), *granted_qos)]),
    }
}
