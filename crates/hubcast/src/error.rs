//! Unified error type for Hubcast.

use hubcast_protocol::ProtocolError;
use hubcast_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// A broadcast fails as a whole: either every protocol's payload was
/// built and handed to the sink, or one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum HubcastError {
    /// Building the envelope failed (a protocol couldn't serialize the
    /// message), or a protocol operation was given an unknown name.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A transport-level error (bind, accept, handshake).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The sink reported that it could not deliver the envelope.
    #[error("delivery failed: {0}")]
    Delivery(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The hub configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}
