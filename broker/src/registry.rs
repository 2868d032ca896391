use std::collections::HashMap;
use std::sync::Arc;

use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, RwLock};

use crate::types::ClientId;

/// A live client's outbound half. Wrapped in its own mutex so dispatcher
/// workers writing to different clients never block each other, while
/// writes to the *same* client serialize instead of interleaving. A second,
/// separate lock orders whole delivery attempts (PUBLISH through its
/// ack-wait) rather than just individual writes; see
/// [`Connection::lock_delivery`].
#[derive(Clone)]
pub struct Connection {
    sink: Arc<Mutex<OwnedWriteHalf>>,
    delivery: Arc<Mutex<()>>,
}

impl Connection {
    #[must_use]
    pub fn new(sink: OwnedWriteHalf) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
            delivery: Arc::new(Mutex::new(())),
        }
    }

    /// Writes `bytes` to this client's socket, holding the per-client lock
    /// for the duration so a concurrent writer cannot interleave frames.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying socket write fails.
    pub async fn send(&self, bytes: &[u8]) -> std::io::Result<()> {
        use tokio::io::AsyncWriteExt;
        let mut sink = self.sink.lock().await;
        sink.write_all(bytes).await
    }

    /// Acquired by a dispatcher worker for an entire PUBLISH-then-ack-wait
    /// sequence to this subscriber (QoS2's PUBREL/PUBCOMP round included),
    /// so two workers delivering different messages to the same subscriber
    /// can never interleave their delivery order, only their wire writes.
    pub async fn lock_delivery(&self) -> tokio::sync::OwnedMutexGuard<()> {
        Arc::clone(&self.delivery).lock_owned().await
    }
}

/// Process-wide mapping from client identifier to that client's live
/// outbound sink. Handlers register on successful CONNECT and deregister on
/// teardown; Dispatcher workers only ever read it.
#[derive(Clone, Default)]
pub struct Registry {
    clients: Arc<RwLock<HashMap<ClientId, Connection>>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, client_id: ClientId, connection: Connection) {
        self.clients.write().await.insert(client_id, connection);
    }

    pub async fn deregister(&self, client_id: &str) {
        self.clients.write().await.remove(client_id);
    }

    pub async fn get(&self, client_id: &str) -> Option<Connection> {
        self.clients.read().await.get(client_id).cloned()
    }

    pub async fn is_connected(&self, client_id: &str) -> bool {
        self.clients.read().await.contains_key(client_id)
    }

    /// Every currently-registered client and its connection, for broadcast
    /// on broker shutdown.
    pub async fn snapshot(&self) -> Vec<(ClientId, Connection)> {
        self.clients
            .read()
            .await
            .iter()
            .map(|(id, conn)| (id.clone(), conn.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn loopback_write_half() -> OwnedWriteHalf {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, (server, _)) =
            tokio::try_join!(tokio::net::TcpStream::connect(addr), listener.accept()).unwrap();
        drop(server);
        client.into_split().1
    }

    #[tokio::test]
    async fn register_then_lookup() {
        let registry = Registry::new();
        assert!(registry.get("c1").await.is_none());

        let connection = Connection::new(loopback_write_half().await);
        registry.register("c1".to_string(), connection).await;
        assert!(registry.is_connected("c1").await);

        registry.deregister("c1").await;
        assert!(registry.get("c1").await.is_none());
    }
}
