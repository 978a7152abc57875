//! The [`HubProtocol`] trait: one named, deterministic message serializer.
//!
//! Everything the broadcast path knows about a wire format goes through
//! this trait. Adding a protocol means implementing it and registering an
//! instance; the envelope builder never looks at which concrete type it
//! is talking to.

use std::fmt;
use std::sync::Arc;

use hubcast_transport::TransferFormat;

use crate::{InvocationMessage, ObjectSerializer, ProtocolError};

/// A wire protocol clients can negotiate.
///
/// ## Determinism
///
/// [`write_message`](Self::write_message) must be a pure function of the
/// message and the protocol's configuration. Two instances built with the
/// same configuration must produce identical bytes for the same message.
/// No timestamps, random ids, or hash-map iteration order may end up in
/// the output, because every client of a protocol receives the one payload
/// computed for it.
///
/// ## Example
///
/// ```rust
/// use hubcast_protocol::{HubProtocol, InvocationMessage, ProtocolError};
/// use hubcast_transport::TransferFormat;
///
/// /// Sends just the target name as plain text.
/// #[derive(Debug)]
/// struct TargetOnly;
///
/// impl HubProtocol for TargetOnly {
///     fn name(&self) -> &str {
///         "target-only"
///     }
///
///     fn version(&self) -> u32 {
///         1
///     }
///
///     fn transfer_format(&self) -> TransferFormat {
///         TransferFormat::Text
///     }
///
///     fn write_message(
///         &self,
///         message: &InvocationMessage,
///     ) -> Result<Vec<u8>, ProtocolError> {
///         Ok(message.target().as_bytes().to_vec())
///     }
/// }
/// ```
pub trait HubProtocol: fmt::Debug + Send + Sync + 'static {
    /// Unique registry key, also the name clients ask for in the handshake.
    fn name(&self) -> &str;

    /// Protocol version advertised to clients.
    fn version(&self) -> u32;

    /// Frame type the payloads should travel in.
    fn transfer_format(&self) -> TransferFormat;

    /// Serializes the message into this protocol's framed bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Serialize` if the message contains a value
    /// this protocol cannot represent.
    fn write_message(
        &self,
        message: &InvocationMessage,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Name of the object serializer in use, for protocols that have one.
    fn object_serializer(&self) -> Option<&str> {
        None
    }

    /// Returns a copy of this protocol that renders arguments with
    /// `serializer` instead. The copy keeps the same name.
    ///
    /// `None` means the protocol has no pluggable serializer.
    fn with_object_serializer(
        &self,
        _serializer: Arc<dyn ObjectSerializer>,
    ) -> Option<Arc<dyn HubProtocol>> {
        None
    }
}
