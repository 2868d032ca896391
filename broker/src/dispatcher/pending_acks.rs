use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::types::{ClientId, PacketId};

/// Outstanding-acknowledgment table shared between the Dispatcher and every
/// Session Handler. A handler that receives PUBACK/PUBREC/PUBCOMP signals
/// the waiter a dispatcher worker installed before sending the PUBLISH;
/// each waiter fires at most once.
#[derive(Clone, Default)]
pub struct PendingAcks {
    table: std::sync::Arc<Mutex<HashMap<(ClientId, PacketId), oneshot::Sender<()>>>>,
}

impl PendingAcks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a waiter for `(client_id, packet_id)`. Must be called
    /// before the PUBLISH/PUBREL that expects the matching ack is sent.
    pub fn register(&self, client_id: &str, packet_id: PacketId) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.table
            .lock()
            .expect("pending_acks mutex poisoned")
            .insert((client_id.to_string(), packet_id), tx);
        rx
    }

    /// Signals the waiter for `(client_id, packet_id)`, if one is
    /// installed. Returns whether a waiter was found.
    pub fn signal(&self, client_id: &str, packet_id: PacketId) -> bool {
        let waiter = self
            .table
            .lock()
            .expect("pending_acks mutex poisoned")
            .remove(&(client_id.to_string(), packet_id));
        match waiter {
            Some(tx) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    /// Removes a waiter without signaling it, used after a timed-out wait.
    pub fn cancel(&self, client_id: &str, packet_id: PacketId) {
        self.table
            .lock()
            .expect("pending_acks mutex poisoned")
            .remove(&(client_id.to_string(), packet_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_wakes_waiter() {
        let acks = PendingAcks::new();
        let rx = acks.register("c1", 5);
        assert!(acks.signal("c1", 5));
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn signal_without_waiter_is_noop() {
        let acks = PendingAcks::new();
        assert!(!acks.signal("c1", 5));
    }

    #[tokio::test]
    async fn cancel_drops_receiver() {
        let acks = PendingAcks::new();
        let rx = acks.register("c1", 5);
        acks.cancel("c1", 5);
        assert!(rx.await.is_err());
    }
}
