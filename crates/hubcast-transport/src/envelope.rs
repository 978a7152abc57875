//! The broadcast envelope: one serialized payload per wire protocol.
//!
//! A hub broadcast doesn't know which protocol each client negotiated.
//! Instead, the message is serialized once per enabled protocol and the
//! results travel together in a [`BroadcastEnvelope`]. The sink then hands
//! every client the payload keyed by its own protocol name.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ "json"        → {"type":1,...}\x1e   │
//! │ "messagepack" → \x16\x96\x01...      │
//! └──────────────────────────────────────┘
//! ```

use indexmap::IndexMap;

/// Serialized payloads for a single broadcast, keyed by protocol name.
///
/// Keys are unique and iterate in the order the protocols were registered,
/// so diagnostics listing an envelope stay stable between broadcasts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastEnvelope {
    payloads: IndexMap<String, Vec<u8>>,
}

impl BroadcastEnvelope {
    /// Creates an envelope with no payloads.
    ///
    /// An empty envelope is a legal broadcast: it means no protocols were
    /// enabled. Whether it is worth delivering is up to the sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the payload serialized for `protocol`, if any.
    pub fn get(&self, protocol: &str) -> Option<&[u8]> {
        self.payloads.get(protocol).map(Vec::as_slice)
    }

    /// Returns `true` if a payload exists for `protocol`.
    pub fn contains(&self, protocol: &str) -> bool {
        self.payloads.contains_key(protocol)
    }

    /// Number of protocols in this envelope.
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Returns `true` if the envelope carries no payloads.
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Protocol names in registration order.
    pub fn protocols(&self) -> impl Iterator<Item = &str> {
        self.payloads.keys().map(String::as_str)
    }

    /// `(protocol, payload)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.payloads
            .iter()
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }

    /// Sum of all payload sizes in bytes.
    pub fn total_bytes(&self) -> usize {
        self.payloads.values().map(Vec::len).sum()
    }

    /// Consumes the envelope, returning the underlying ordered map.
    pub fn into_payloads(self) -> IndexMap<String, Vec<u8>> {
        self.payloads
    }
}

/// Builds an envelope from fully serialized payloads.
///
/// Collecting is the only way to fill an envelope, so an envelope never
/// exists in a half-built state. A repeated protocol name keeps its first
/// position and takes the later payload.
impl FromIterator<(String, Vec<u8>)> for BroadcastEnvelope {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        Self {
            payloads: iter.into_iter().collect(),
        }
    }
}
