//! Broker Supervisor: owns the listening socket and the shared handle
//! (registry + dispatcher + repository) every session task is spawned
//! with. Mirrors the teacher's listener/dispatcher split, collapsed to a
//! single listener since multi-listener fan-out, ACL, bridging and the
//! rule engine are out of scope here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use mqttbroker_codec::{DisconnectPacket, EncodePacket, ReasonCode};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::constants::{ACK_TIMEOUT_SECS, DISPATCHER_WORKERS, LISTEN_BACKLOG};
use crate::dispatcher::Dispatcher;
use crate::error::Error;
use crate::registry::Registry;
use crate::repository::Repository;
use crate::session;

/// How long the accept loop blocks before checking the shutdown flag again.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Cheaply-clonable handle to the broker's shared state. Every accepted
/// connection's session task gets a clone.
#[derive(Clone)]
pub struct Broker {
    pub repository: Arc<dyn Repository>,
    pub registry: Registry,
    pub dispatcher: Dispatcher,
    shutdown: Arc<AtomicBool>,
}

impl Broker {
    /// Builds a broker handle with the default dispatcher pool size and ack
    /// timeout. See [`Broker::with_dispatcher_config`] to override either
    /// from [`crate::config::DispatcherConfig`].
    #[must_use]
    pub fn new(repository: Arc<dyn Repository>) -> (Self, Vec<JoinHandle<()>>) {
        Self::with_dispatcher_config(repository, DISPATCHER_WORKERS, ACK_TIMEOUT_SECS)
    }

    /// Builds a broker handle and spawns its dispatcher worker pool. The
    /// caller must eventually pass the returned join handles to
    /// [`serve`] (or drain them itself) for a clean shutdown.
    #[must_use]
    pub fn with_dispatcher_config(
        repository: Arc<dyn Repository>,
        dispatcher_workers: usize,
        ack_timeout_secs: u64,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let registry = Registry::new();
        let (dispatcher, workers) = Dispatcher::spawn_with(
            Arc::clone(&repository),
            registry.clone(),
            dispatcher_workers,
            ack_timeout_secs,
        );
        (
            Self {
                repository,
                registry,
                dispatcher,
                shutdown: Arc::new(AtomicBool::new(false)),
            },
            workers,
        )
    }

    /// Signals the accept loop and every live connection to shut down. The
    /// socket backing this call does not need to be the one that created
    /// the broker handle; clones share the same flag.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Binds `bind_addr` and runs the accept loop until [`Broker::request_shutdown`]
/// is called, then broadcasts DISCONNECT to every live client and drains the
/// dispatcher before returning.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn serve(
    broker: Broker,
    bind_addr: &str,
    dispatcher_workers: Vec<JoinHandle<()>>,
) -> Result<(), Error> {
    let listener = TcpListener::bind(bind_addr).await?;
    info!("mqttbroker: listening on {bind_addr} (backlog {LISTEN_BACKLOG})");

    while !broker.is_shutting_down() {
        match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, addr))) => {
                debug!("accepted connection from {addr}");
                let repository = Arc::clone(&broker.repository);
                let registry = broker.registry.clone();
                let dispatcher = broker.dispatcher.clone();
                tokio::spawn(async move {
                    session::run(stream, repository, registry, dispatcher).await;
                });
            }
            Ok(Err(e)) => error!("accept failed: {e}"),
            Err(_) => {
                // Poll timeout elapsed; loop back around to re-check the
                // shutdown flag.
            }
        }
    }

    shutdown(&broker, dispatcher_workers).await;
    Ok(())
}

async fn shutdown(broker: &Broker, workers: Vec<JoinHandle<()>>) {
    info!("mqttbroker: shutting down");
    let disconnect = DisconnectPacket {
        reason_code: ReasonCode::ServerUnavailable,
    };
    let mut buf = Vec::new();
    if disconnect.encode(&mut buf).is_ok() {
        for (client_id, connection) in broker.registry.snapshot().await {
            if connection.send(&buf).await.is_err() {
                warn!("shutdown: failed to notify {client_id}");
            }
        }
    }

    broker.dispatcher.clone().shutdown(workers).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;

    #[tokio::test]
    async fn serve_exits_after_shutdown_requested() {
        let repository: Arc<dyn Repository> = Arc::new(MemoryRepository::default());
        let (broker, workers) = Broker::new(repository);
        let shutdown_handle = broker.clone();

        let serving = tokio::spawn(async move { serve(broker, "127.0.0.1:0", workers).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_handle.request_shutdown();

        let result = tokio::time::timeout(Duration::from_secs(2), serving)
            .await
            .expect("serve task did not exit")
            .unwrap();
        assert!(result.is_ok());
    }
}
