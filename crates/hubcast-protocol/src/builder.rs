//! Builds a [`BroadcastEnvelope`] by running every registered protocol.

use hubcast_transport::BroadcastEnvelope;

use crate::{InvocationMessage, ProtocolError, ProtocolRegistry};

/// Serializes `message` once per registered protocol.
///
/// The envelope holds exactly one payload per protocol, keyed by protocol
/// name, in registration order. Every payload is byte-for-byte what that
/// protocol's [`write_message`](crate::HubProtocol::write_message) returns.
///
/// An empty registry yields an empty envelope.
///
/// # Errors
/// If any protocol fails, the whole build fails with that protocol's
/// `ProtocolError::Serialize` and no envelope is produced. Some clients
/// getting a message while others silently don't is never an outcome.
pub fn build_envelope(
    message: &InvocationMessage,
    registry: &ProtocolRegistry,
) -> Result<BroadcastEnvelope, ProtocolError> {
    let envelope = registry
        .resolve_all()
        .map(|protocol| {
            protocol
                .write_message(message)
                .map(|bytes| (protocol.name().to_string(), bytes))
                .inspect_err(|e| {
                    tracing::warn!(
                        protocol = protocol.name(),
                        method = message.target(),
                        error = %e,
                        "serialization failed, broadcast aborted"
                    );
                })
        })
        .collect::<Result<BroadcastEnvelope, _>>()?;

    tracing::debug!(
        method = message.target(),
        protocols = envelope.len(),
        bytes = envelope.total_bytes(),
        "broadcast envelope built"
    );
    Ok(envelope)
}
