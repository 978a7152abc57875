//! The protocol registry: which wire protocols a hub broadcasts in.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::{HubProtocol, JsonHubProtocol, ObjectSerializer, ProtocolError};

/// Ordered set of enabled hub protocols, keyed by protocol name.
///
/// Registering a name that already exists replaces that entry **in place**:
/// the new protocol takes over the old slot instead of moving to the end,
/// so the order protocols are listed in (and the order of envelope
/// payloads) stays stable across reconfiguration.
///
/// The registry is mutable while a hub is being configured. Once a hub
/// context is built it is frozen behind an `Arc` and only read.
#[derive(Debug, Clone, Default)]
pub struct ProtocolRegistry {
    protocols: IndexMap<String, Arc<dyn HubProtocol>>,
}

impl ProtocolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding only the default JSON protocol.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(JsonHubProtocol::default());
        registry
    }

    /// Adds `protocol`, replacing any protocol with the same name.
    ///
    /// Returns the protocol that was replaced, if any.
    pub fn register(
        &mut self,
        protocol: impl HubProtocol,
    ) -> Option<Arc<dyn HubProtocol>> {
        self.register_shared(Arc::new(protocol))
    }

    /// Same as [`register`](Self::register) for an already shared protocol.
    pub fn register_shared(
        &mut self,
        protocol: Arc<dyn HubProtocol>,
    ) -> Option<Arc<dyn HubProtocol>> {
        let name = protocol.name().to_string();
        let replaced = self.protocols.insert(name.clone(), protocol);
        tracing::debug!(
            protocol = %name,
            replaced = replaced.is_some(),
            "protocol registered"
        );
        replaced
    }

    /// Registers each protocol in order, with the same override rules as
    /// [`register`](Self::register).
    pub fn register_all(
        &mut self,
        protocols: impl IntoIterator<Item = Arc<dyn HubProtocol>>,
    ) {
        for protocol in protocols {
            self.register_shared(protocol);
        }
    }

    /// Makes `protocols` the complete active set, dropping everything
    /// registered before.
    pub fn replace_all(
        &mut self,
        protocols: impl IntoIterator<Item = Arc<dyn HubProtocol>>,
    ) {
        self.protocols.clear();
        self.register_all(protocols);
    }

    /// Swaps the object serializer of the protocol called `name`, keeping
    /// its name and position.
    ///
    /// # Errors
    /// - `ProtocolError::UnknownProtocol` if `name` isn't registered.
    /// - `ProtocolError::StrategyNotSupported` if that protocol has no
    ///   pluggable object serializer.
    pub fn override_object_serializer(
        &mut self,
        name: &str,
        serializer: Arc<dyn ObjectSerializer>,
    ) -> Result<(), ProtocolError> {
        let slot = self
            .protocols
            .get_mut(name)
            .ok_or_else(|| ProtocolError::UnknownProtocol(name.to_string()))?;

        let strategy = serializer.name();
        let swapped = slot
            .with_object_serializer(serializer)
            .ok_or_else(|| ProtocolError::StrategyNotSupported(name.to_string()))?;
        *slot = swapped;

        tracing::debug!(protocol = name, strategy, "object serializer swapped");
        Ok(())
    }

    /// Every active protocol, in registration order.
    pub fn resolve_all(&self) -> impl ExactSizeIterator<Item = &Arc<dyn HubProtocol>> {
        self.protocols.values()
    }

    /// Looks up a protocol by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn HubProtocol>> {
        self.protocols.get(name)
    }

    /// Returns `true` if a protocol called `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.protocols.contains_key(name)
    }

    /// Protocol names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.protocols.keys().map(String::as_str)
    }

    /// Number of distinct protocols registered.
    pub fn count(&self) -> usize {
        self.protocols.len()
    }

    /// Returns `true` if no protocols are registered.
    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}
