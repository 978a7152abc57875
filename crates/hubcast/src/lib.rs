//! # Hubcast
//!
//! Multi-protocol hub broadcasting.
//!
//! A hub method call is serialized once for every enabled wire protocol
//! (JSON, MessagePack, or your own [`HubProtocol`](hubcast_protocol::HubProtocol)),
//! bundled into a single envelope keyed by protocol name, and handed to a
//! [`ConnectionSink`](hubcast_transport::ConnectionSink) that gives every
//! client the payload for the protocol it negotiated.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hubcast::prelude::*;
//!
//! # async fn run() -> Result<(), HubcastError> {
//! let clients = Arc::new(ClientFanout::<WebSocketConnection>::new());
//! let context = HubContextBuilder::new()
//!     .hub("chat")
//!     .add_hub_protocol(MessagePackHubProtocol)
//!     .build(Arc::clone(&clients))?;
//!
//! context.send_all("newMessage", ["alice", "hello"]).await?;
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
mod options;

pub use context::{HubContext, HubContextBuilder};
pub use error::HubcastError;
pub use options::{HubOptions, JsonOptions, ProtocolKind, SerializerKind};

pub mod prelude {
    pub use crate::{HubContext, HubContextBuilder, HubOptions, HubcastError};
    pub use hubcast_protocol::{
        CanonicalJsonSerializer, HubProtocol, InvocationMessage, JsonHubProtocol,
        JsonHubProtocolOptions, MessagePackHubProtocol, ObjectSerializer,
        ProtocolRegistry, SerdeJsonSerializer, Value,
    };
    pub use hubcast_transport::{
        BroadcastEnvelope, ClientFanout, Connection, ConnectionSink, TransferFormat,
        WebSocketConnection, WebSocketTransport,
    };
}
