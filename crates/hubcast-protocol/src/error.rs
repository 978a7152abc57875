//! Error types for the protocol layer.
//!
//! Serialization failures carry the name of the protocol that failed so a
//! rejected broadcast can be traced back to the codec that rejected it.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A protocol could not represent the message (for example a map key
    /// JSON has no encoding for). Fails the whole broadcast.
    #[error("{protocol} protocol failed to serialize message: {source}")]
    Serialize {
        /// Name of the protocol that failed.
        protocol: String,
        /// The underlying serializer error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No protocol with this name is registered.
    #[error("protocol '{0}' is not registered")]
    UnknownProtocol(String),

    /// The protocol has no pluggable object serializer to swap.
    #[error("protocol '{0}' does not support swapping its object serializer")]
    StrategyNotSupported(String),
}

impl ProtocolError {
    pub(crate) fn serialize(
        protocol: &str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Serialize {
            protocol: protocol.to_string(),
            source: source.into(),
        }
    }
}
