//! Hub protocols for Hubcast.
//!
//! This crate turns one protocol-agnostic [`InvocationMessage`] into the
//! bytes each wire protocol would put on the wire:
//!
//! - **Types** ([`InvocationMessage`], [`Value`]) — what application code
//!   broadcasts.
//! - **Protocols** ([`HubProtocol`] trait, [`JsonHubProtocol`],
//!   [`MessagePackHubProtocol`]) — named, deterministic serializers.
//! - **Object serializers** ([`ObjectSerializer`], [`SerdeJsonSerializer`],
//!   [`CanonicalJsonSerializer`]) — swappable value rendering for JSON.
//! - **Registry** ([`ProtocolRegistry`]) — the ordered set of enabled
//!   protocols, with override-by-name.
//! - **Envelope building** ([`build_envelope`]) — one payload per protocol,
//!   all or nothing.
//!
//! # Architecture
//!
//! ```text
//! InvocationMessage → build_envelope(registry) → BroadcastEnvelope → ConnectionSink
//! ```
//!
//! # Feature Flags
//!
//! - `messagepack` (default) — [`MessagePackHubProtocol`] via `rmp-serde`

mod builder;
mod error;
mod json;
#[cfg(feature = "messagepack")]
mod messagepack;
mod protocol;
mod registry;
mod serializer;
mod types;

pub use builder::build_envelope;
pub use error::ProtocolError;
pub use json::{
    JsonHubProtocol, JsonHubProtocolOptions, JSON_PROTOCOL_NAME, RECORD_SEPARATOR,
};
#[cfg(feature = "messagepack")]
pub use messagepack::{MessagePackHubProtocol, MESSAGEPACK_PROTOCOL_NAME};
pub use protocol::HubProtocol;
pub use registry::ProtocolRegistry;
pub use serializer::{CanonicalJsonSerializer, ObjectSerializer, SerdeJsonSerializer};
pub use types::{InvocationMessage, Value};

pub use hubcast_transport::{BroadcastEnvelope, TransferFormat};
