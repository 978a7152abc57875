//! `HubContext` builder and the broadcast entry point.
//!
//! This is where the layers meet: the builder assembles a protocol
//! registry, `build` freezes it, and every `send_all` turns one call into
//! one envelope handed to the sink.

use std::sync::Arc;

use hubcast_protocol::{
    build_envelope, HubProtocol, InvocationMessage, JsonHubProtocol,
    JsonHubProtocolOptions, ObjectSerializer, ProtocolRegistry, Value,
    JSON_PROTOCOL_NAME,
};
use hubcast_transport::ConnectionSink;

use crate::options::validate_hub_name;
use crate::{HubOptions, HubcastError};

/// Builder for configuring a [`HubContext`].
///
/// Starts with the JSON protocol enabled, like a default hub.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use hubcast::prelude::*;
///
/// let builder = HubContextBuilder::new()
///     .hub("chat")
///     .add_hub_protocol(MessagePackHubProtocol)
///     .with_json_serializer(Arc::new(CanonicalJsonSerializer));
///
/// let names: Vec<&str> = builder.protocols().names().collect();
/// assert_eq!(names, ["json", "messagepack"]);
/// ```
#[derive(Debug)]
pub struct HubContextBuilder {
    hub: String,
    registry: ProtocolRegistry,
}

impl HubContextBuilder {
    /// Creates a builder for hub `"hub"` with the default protocols.
    pub fn new() -> Self {
        Self {
            hub: "hub".to_string(),
            registry: ProtocolRegistry::with_defaults(),
        }
    }

    /// Creates a builder from loaded options.
    pub fn from_options(options: &HubOptions) -> Self {
        Self {
            hub: options.hub.clone(),
            registry: options.registry(),
        }
    }

    /// Sets the hub name.
    pub fn hub(mut self, name: impl Into<String>) -> Self {
        self.hub = name.into();
        self
    }

    /// Makes `protocols` the complete set of enabled protocols.
    pub fn with_hub_protocols(
        mut self,
        protocols: impl IntoIterator<Item = Arc<dyn HubProtocol>>,
    ) -> Self {
        self.registry.replace_all(protocols);
        self
    }

    /// Enables one more protocol, replacing any with the same name.
    pub fn add_hub_protocol(mut self, protocol: impl HubProtocol) -> Self {
        self.registry.register(protocol);
        self
    }

    /// Renders JSON arguments with `serializer`.
    ///
    /// The JSON protocol keeps its name and position. If no JSON protocol
    /// with a pluggable serializer is registered, a default one using
    /// `serializer` is registered under `"json"`.
    pub fn with_json_serializer(
        mut self,
        serializer: Arc<dyn ObjectSerializer>,
    ) -> Self {
        if self
            .registry
            .override_object_serializer(JSON_PROTOCOL_NAME, Arc::clone(&serializer))
            .is_err()
        {
            self.registry.register(JsonHubProtocol::with_serializer(
                JsonHubProtocolOptions::default(),
                serializer,
            ));
        }
        self
    }

    /// The registry as configured so far.
    pub fn protocols(&self) -> &ProtocolRegistry {
        &self.registry
    }

    /// Freezes the configuration and attaches the sink broadcasts go to.
    ///
    /// # Errors
    /// Returns `HubcastError::Config` if the hub name is empty or blank.
    pub fn build<S: ConnectionSink>(
        self,
        sink: S,
    ) -> Result<HubContext<S>, HubcastError> {
        validate_hub_name(&self.hub)?;

        let names: Vec<&str> = self.registry.names().collect();
        tracing::info!(hub = %self.hub, protocols = ?names, "hub context built");

        Ok(HubContext {
            hub: self.hub,
            registry: Arc::new(self.registry),
            sink,
        })
    }
}

impl Default for HubContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured hub: broadcasts go through every enabled protocol and
/// then to the sink.
///
/// The registry is read-only from here on, so concurrent broadcasts share
/// it without locking.
#[derive(Debug, Clone)]
pub struct HubContext<S> {
    hub: String,
    registry: Arc<ProtocolRegistry>,
    sink: S,
}

impl<S: ConnectionSink> HubContext<S> {
    /// Creates a builder.
    pub fn builder() -> HubContextBuilder {
        HubContextBuilder::new()
    }

    /// The hub name.
    pub fn hub(&self) -> &str {
        &self.hub
    }

    /// The enabled protocols.
    pub fn protocols(&self) -> &ProtocolRegistry {
        &self.registry
    }

    /// The sink envelopes are delivered to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Invokes `target` on every connected client.
    pub async fn send_all<I>(
        &self,
        target: impl Into<String>,
        arguments: I,
    ) -> Result<(), HubcastError>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let message = InvocationMessage::new(target, arguments);
        self.broadcast(&message).await
    }

    /// Serializes `message` for every protocol and delivers the envelope.
    ///
    /// The sink is called once, after the whole envelope is built. If any
    /// protocol fails to serialize, nothing is delivered.
    pub async fn broadcast(
        &self,
        message: &InvocationMessage,
    ) -> Result<(), HubcastError> {
        let envelope = build_envelope(message, &self.registry)?;

        tracing::debug!(
            hub = %self.hub,
            method = message.target(),
            protocols = envelope.len(),
            "broadcasting"
        );

        self.sink.deliver(envelope).await.map_err(|e| {
            tracing::warn!(hub = %self.hub, error = %e, "broadcast delivery failed");
            HubcastError::Delivery(Box::new(e))
        })
    }
}
