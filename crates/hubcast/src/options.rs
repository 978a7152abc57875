//! Hub configuration that can be loaded from a file.

use std::sync::Arc;

use hubcast_protocol::{
    CanonicalJsonSerializer, HubProtocol, JsonHubProtocol, JsonHubProtocolOptions,
    MessagePackHubProtocol, ObjectSerializer, ProtocolRegistry, SerdeJsonSerializer,
};
use serde::{Deserialize, Serialize};

use crate::HubcastError;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// A built-in hub protocol, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    Json,
    #[serde(rename = "messagepack")]
    MessagePack,
}

/// A built-in object serializer for the JSON protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializerKind {
    #[default]
    SerdeJson,
    CanonicalJson,
}

impl SerializerKind {
    /// Creates the strategy this kind names.
    pub fn build(self) -> Arc<dyn ObjectSerializer> {
        match self {
            Self::SerdeJson => Arc::new(SerdeJsonSerializer),
            Self::CanonicalJson => Arc::new(CanonicalJsonSerializer),
        }
    }
}

// ---------------------------------------------------------------------------
// HubOptions
// ---------------------------------------------------------------------------

/// Rejects hub names that are empty or only whitespace.
pub(crate) fn validate_hub_name(name: &str) -> Result<(), HubcastError> {
    if name.trim().is_empty() {
        return Err(HubcastError::Config("hub name must not be empty".into()));
    }
    Ok(())
}

/// JSON protocol settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonOptions {
    /// Spaces per nesting level in argument payloads. `None` is compact.
    #[serde(default)]
    pub indent: Option<usize>,

    /// How argument values are rendered.
    #[serde(default)]
    pub serializer: SerializerKind,
}

/// Settings for a hub context.
///
/// Every field has a default, so an empty JSON object is a valid config:
///
/// ```rust
/// use hubcast::{HubOptions, ProtocolKind};
///
/// let options = HubOptions::from_json_str(r#"{
///     "hub": "chat",
///     "protocols": ["messagepack", "json"],
///     "json": { "indent": 2, "serializer": "canonical_json" }
/// }"#).unwrap();
/// assert_eq!(options.protocols, [ProtocolKind::MessagePack, ProtocolKind::Json]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubOptions {
    /// Name of the hub broadcasts are sent on.
    pub hub: String,

    /// Enabled protocols, in the order they are registered.
    pub protocols: Vec<ProtocolKind>,

    /// JSON protocol settings.
    pub json: JsonOptions,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            hub: "hub".to_string(),
            protocols: vec![ProtocolKind::Json],
            json: JsonOptions::default(),
        }
    }
}

impl HubOptions {
    /// Parses options from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, HubcastError> {
        serde_json::from_str(text).map_err(|e| HubcastError::Config(e.to_string()))
    }

    /// Checks the options for values no hub can run with.
    pub fn validate(&self) -> Result<(), HubcastError> {
        validate_hub_name(&self.hub)
    }

    /// Builds the protocol registry these options describe.
    ///
    /// A protocol listed twice is registered twice; the second
    /// registration replaces the first in place.
    pub fn registry(&self) -> ProtocolRegistry {
        let mut registry = ProtocolRegistry::new();
        registry.register_all(self.protocols.iter().map(|kind| self.protocol(*kind)));
        registry
    }

    fn protocol(&self, kind: ProtocolKind) -> Arc<dyn HubProtocol> {
        match kind {
            ProtocolKind::Json => Arc::new(JsonHubProtocol::with_serializer(
                JsonHubProtocolOptions {
                    indent: self.json.indent,
                },
                self.json.serializer.build(),
            )),
            ProtocolKind::MessagePack => Arc::new(MessagePackHubProtocol),
        }
    }
}
