//! The JSON hub protocol (`"json"`).
//!
//! An invocation is written as a single JSON object terminated by the
//! ASCII record separator:
//!
//! ```text
//! {"type":1,"target":"newMessage","arguments":["alice","hi"]}\x1e
//! ```
//!
//! The outer object is always compact. The `arguments` array is rendered
//! by the configured [`ObjectSerializer`] and honors the configured
//! indentation.

use std::sync::Arc;

use hubcast_transport::TransferFormat;
use serde::{Deserialize, Serialize};

use crate::{
    HubProtocol, InvocationMessage, ObjectSerializer, ProtocolError,
    SerdeJsonSerializer,
};

/// Registry key of the JSON protocol.
pub const JSON_PROTOCOL_NAME: &str = "json";

/// Terminates every JSON hub message.
pub const RECORD_SEPARATOR: u8 = 0x1e;

/// Message type tag for invocations.
const INVOCATION_MESSAGE_TYPE: u8 = 1;

/// Options for [`JsonHubProtocol`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonHubProtocolOptions {
    /// Spaces per nesting level in the arguments array. `None` is compact.
    #[serde(default)]
    pub indent: Option<usize>,
}

/// Text protocol speaking JSON with a pluggable object serializer.
///
/// ```rust
/// use hubcast_protocol::{HubProtocol, InvocationMessage, JsonHubProtocol};
///
/// let json = JsonHubProtocol::default();
/// let bytes = json
///     .write_message(&InvocationMessage::new("target", ["argument"]))
///     .unwrap();
/// assert_eq!(bytes, b"{\"type\":1,\"target\":\"target\",\"arguments\":[\"argument\"]}\x1e");
/// ```
#[derive(Debug, Clone)]
pub struct JsonHubProtocol {
    options: JsonHubProtocolOptions,
    serializer: Arc<dyn ObjectSerializer>,
}

impl JsonHubProtocol {
    /// Creates a JSON protocol with the default serde_json strategy.
    pub fn new(options: JsonHubProtocolOptions) -> Self {
        Self::with_serializer(options, Arc::new(SerdeJsonSerializer))
    }

    /// Creates a JSON protocol using `serializer` for argument values.
    pub fn with_serializer(
        options: JsonHubProtocolOptions,
        serializer: Arc<dyn ObjectSerializer>,
    ) -> Self {
        Self {
            options,
            serializer,
        }
    }

    /// The options this protocol was built with.
    pub fn options(&self) -> JsonHubProtocolOptions {
        self.options
    }

    /// The strategy rendering argument values.
    pub fn serializer(&self) -> &Arc<dyn ObjectSerializer> {
        &self.serializer
    }

    fn write_invocation(
        &self,
        message: &InvocationMessage,
        out: &mut Vec<u8>,
    ) -> serde_json::Result<()> {
        out.extend_from_slice(b"{\"type\":");
        serde_json::to_writer(&mut *out, &INVOCATION_MESSAGE_TYPE)?;
        out.extend_from_slice(b",\"target\":");
        serde_json::to_writer(&mut *out, message.target())?;
        out.extend_from_slice(b",\"arguments\":");
        self.serializer
            .write_arguments(message.arguments(), self.options.indent, out)?;
        out.push(b'}');
        Ok(())
    }
}

impl Default for JsonHubProtocol {
    fn default() -> Self {
        Self::new(JsonHubProtocolOptions::default())
    }
}

impl HubProtocol for JsonHubProtocol {
    fn name(&self) -> &str {
        JSON_PROTOCOL_NAME
    }

    fn version(&self) -> u32 {
        1
    }

    fn transfer_format(&self) -> TransferFormat {
        TransferFormat::Text
    }

    fn write_message(
        &self,
        message: &InvocationMessage,
    ) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::with_capacity(64);
        self.write_invocation(message, &mut out)
            .map_err(|e| ProtocolError::serialize(self.name(), e))?;
        out.push(RECORD_SEPARATOR);
        Ok(out)
    }

    fn object_serializer(&self) -> Option<&str> {
        Some(self.serializer.name())
    }

    fn with_object_serializer(
        &self,
        serializer: Arc<dyn ObjectSerializer>,
    ) -> Option<Arc<dyn HubProtocol>> {
        Some(Arc::new(Self::with_serializer(self.options, serializer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CanonicalJsonSerializer, Value};

    fn message() -> InvocationMessage {
        InvocationMessage::new("target", ["argument"])
    }

    #[test]
    fn test_compact_invocation_bytes() {
        let bytes = JsonHubProtocol::default().write_message(&message()).unwrap();
        assert_eq!(
            bytes,
            b"{\"type\":1,\"target\":\"target\",\"arguments\":[\"argument\"]}\x1e"
        );
    }

    #[test]
    fn test_indent_only_affects_arguments() {
        let json = JsonHubProtocol::new(JsonHubProtocolOptions {
            indent: Some(2),
        });
        let bytes = json.write_message(&message()).unwrap();
        assert_eq!(
            bytes,
            b"{\"type\":1,\"target\":\"target\",\"arguments\":[\n  \"argument\"\n]}\x1e"
        );
    }

    #[test]
    fn test_target_is_escaped() {
        let msg = InvocationMessage::new("say \"hi\"", Vec::<Value>::new());
        let bytes = JsonHubProtocol::default().write_message(&msg).unwrap();
        assert_eq!(
            bytes,
            b"{\"type\":1,\"target\":\"say \\\"hi\\\"\",\"arguments\":[]}\x1e"
        );
    }

    #[test]
    fn test_output_parses_as_json() {
        let msg = InvocationMessage::new(
            "update",
            vec![Value::from(1), Value::Null, Value::from(vec![Value::from(true)])],
        );
        let bytes = JsonHubProtocol::default().write_message(&msg).unwrap();
        let (last, body) = bytes.split_last().unwrap();
        assert_eq!(*last, RECORD_SEPARATOR);

        let parsed: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(parsed["type"], 1);
        assert_eq!(parsed["target"], "update");
        assert_eq!(parsed["arguments"], serde_json::json!([1, null, [true]]));
    }

    #[test]
    fn test_unrepresentable_argument_fails_with_protocol_name() {
        let msg = InvocationMessage::new(
            "target",
            [Value::Map(vec![(Value::Array(vec![]), Value::Null)])],
        );
        let err = JsonHubProtocol::default().write_message(&msg).unwrap_err();
        match err {
            ProtocolError::Serialize { protocol, .. } => assert_eq!(protocol, "json"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_swapping_serializer_keeps_name_and_options() {
        let json = JsonHubProtocol::new(JsonHubProtocolOptions {
            indent: Some(4),
        });
        assert_eq!(json.object_serializer(), Some("serde_json"));

        let swapped = json
            .with_object_serializer(Arc::new(CanonicalJsonSerializer))
            .unwrap();
        assert_eq!(swapped.name(), "json");
        assert_eq!(swapped.object_serializer(), Some("canonical_json"));
        assert_eq!(swapped.transfer_format(), TransferFormat::Text);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: JsonHubProtocolOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, JsonHubProtocolOptions::default());
        let options: JsonHubProtocolOptions =
            serde_json::from_str(r#"{"indent":2}"#).unwrap();
        assert_eq!(options.indent, Some(2));
    }
}
