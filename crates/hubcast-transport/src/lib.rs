//! Transport layer for Hubcast.
//!
//! Provides the [`ConnectionSink`] trait the broadcast pipeline hands its
//! finished [`BroadcastEnvelope`] to, the [`Connection`] trait for a single
//! client, and [`ClientFanout`], a sink that routes each client the payload
//! matching its negotiated protocol.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket client connections via `tokio-tungstenite`

mod envelope;
mod error;
mod fanout;
#[cfg(feature = "websocket")]
mod websocket;

pub use envelope::BroadcastEnvelope;
pub use error::TransportError;
pub use fanout::ClientFanout;
#[cfg(feature = "websocket")]
pub use websocket::{PendingConnection, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// How a protocol's payloads travel on a frame-based transport.
///
/// Text protocols (JSON) go out as WebSocket text frames, binary
/// protocols (MessagePack) as binary frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferFormat {
    Text,
    Binary,
}

impl fmt::Display for TransferFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "Text"),
            Self::Binary => write!(f, "Binary"),
        }
    }
}

/// Accepts a completed broadcast envelope for delivery.
///
/// The pipeline calls [`deliver`](Self::deliver) exactly once per broadcast,
/// and only after every protocol's payload has been serialized. A sink never
/// sees a partially built envelope.
///
/// # Example
///
/// ```rust
/// use hubcast_transport::{BroadcastEnvelope, ConnectionSink, TransportError};
///
/// /// Drops every envelope on the floor.
/// struct NullSink;
///
/// impl ConnectionSink for NullSink {
///     type Error = TransportError;
///
///     async fn deliver(
///         &self,
///         _envelope: BroadcastEnvelope,
///     ) -> Result<(), TransportError> {
///         Ok(())
///     }
/// }
/// ```
pub trait ConnectionSink: Send + Sync + 'static {
    /// The error type reported when delivery fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Delivers the envelope to every connected client.
    fn deliver(
        &self,
        envelope: BroadcastEnvelope,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// A shared sink is still a sink. Lets an accept loop keep adding clients
/// to the same sink a hub context broadcasts through.
impl<S: ConnectionSink> ConnectionSink for Arc<S> {
    type Error = S::Error;

    fn deliver(
        &self,
        envelope: BroadcastEnvelope,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        (**self).deliver(envelope)
    }
}

/// A single client connection that has negotiated a hub protocol.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Name of the protocol this client negotiated (e.g. `"json"`).
    fn protocol(&self) -> &str;

    /// Frame type this client expects payloads in.
    fn transfer_format(&self) -> TransferFormat;

    /// Sends one serialized payload to the client.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "json");
        map.insert(ConnectionId::new(2), "messagepack");
        assert_eq!(map[&ConnectionId::new(2)], "messagepack");
    }

    #[test]
    fn test_transfer_format_display() {
        assert_eq!(TransferFormat::Text.to_string(), "Text");
        assert_eq!(TransferFormat::Binary.to_string(), "Binary");
    }
}
