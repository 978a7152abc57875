//! Fan-out sink: one envelope in, one payload out per connected client.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::{BroadcastEnvelope, Connection, ConnectionId, ConnectionSink, TransportError};

/// A [`ConnectionSink`] that delivers to a set of live connections.
///
/// Each connection receives exactly the payload stored under the protocol
/// it negotiated. Connections are kept in join order. A connection whose
/// send fails is dropped from the set.
pub struct ClientFanout<C: Connection> {
    connections: RwLock<IndexMap<ConnectionId, Arc<C>>>,
}

impl<C: Connection> ClientFanout<C> {
    /// Creates a fan-out with no connections.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(IndexMap::new()),
        }
    }

    /// Adds a connection. Replaces any connection with the same id.
    pub async fn add(&self, conn: C) -> ConnectionId {
        let id = conn.id();
        tracing::debug!(conn_id = %id, protocol = conn.protocol(), "client added");
        self.connections.write().await.insert(id, Arc::new(conn));
        id
    }

    /// Removes a connection, returning it if it was present.
    pub async fn remove(&self, id: ConnectionId) -> Option<Arc<C>> {
        let removed = self.connections.write().await.shift_remove(&id);
        if removed.is_some() {
            tracing::debug!(conn_id = %id, "client removed");
        }
        removed
    }

    /// Number of connected clients.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no clients are connected.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    /// Ids of all connected clients in join order.
    pub async fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.read().await.keys().copied().collect()
    }
}

impl<C: Connection> Default for ClientFanout<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connection> ConnectionSink for ClientFanout<C> {
    type Error = TransportError;

    /// Sends every client its protocol's payload.
    ///
    /// All clients are attempted even when some fail. The lock is released
    /// before any send is awaited, so slow clients don't block `add`/`remove`.
    /// Clients skipped for lack of a payload stay connected.
    async fn deliver(
        &self,
        envelope: BroadcastEnvelope,
    ) -> Result<(), TransportError> {
        let connections: Vec<Arc<C>> =
            self.connections.read().await.values().cloned().collect();

        let total = connections.len();
        let mut failed = 0;
        let mut broken = Vec::new();

        for conn in &connections {
            let Some(payload) = envelope.get(conn.protocol()) else {
                tracing::warn!(
                    conn_id = %conn.id(),
                    protocol = conn.protocol(),
                    "no payload for negotiated protocol, skipping client"
                );
                failed += 1;
                continue;
            };

            if let Err(e) = conn.send(payload).await {
                tracing::warn!(
                    conn_id = %conn.id(),
                    protocol = conn.protocol(),
                    error = %e,
                    "send failed, dropping client"
                );
                failed += 1;
                broken.push(conn.id());
            }
        }

        if !broken.is_empty() {
            let mut guard = self.connections.write().await;
            for id in &broken {
                guard.shift_remove(id);
            }
        }

        tracing::debug!(
            clients = total,
            failed,
            protocols = envelope.len(),
            "envelope delivered"
        );

        if failed > 0 {
            return Err(TransportError::Delivery { failed, total });
        }
        Ok(())
    }
}
