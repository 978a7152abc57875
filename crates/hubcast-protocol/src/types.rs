//! Protocol-agnostic message types.
//!
//! An [`InvocationMessage`] is what application code asks for: "call
//! `target` on every client with these arguments". It says nothing about
//! JSON or MessagePack. Each hub protocol decides how to turn it into bytes.

use serde::ser::{Serialize, SerializeMap, Serializer};

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// An argument value that every hub protocol knows how to carry.
///
/// The variants mirror the data model shared by JSON and MessagePack.
/// `Map` is a list of pairs rather than a hash map: entries keep the order
/// they were built in, so serializing the same value twice always yields
/// the same bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Raw bytes. Text protocols choose their own encoding for these.
    Binary(Vec<u8>),
    Array(Vec<Value>),
    /// Key/value pairs in insertion order. Keys may be any value, but not
    /// every protocol accepts non-string keys.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Returns the string if this is a `Value::String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` if this is `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Serde mapping used by every serde-backed protocol.
///
/// `Binary` goes through `serialize_bytes`, so MessagePack writes a `bin`
/// and serde_json writes an array of numbers.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::Binary(bytes) => serializer.serialize_bytes(bytes),
            Self::Array(items) => items.serialize(serializer),
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

// ---------------------------------------------------------------------------
// InvocationMessage
// ---------------------------------------------------------------------------

/// A remote method call to broadcast: a target name plus positional
/// arguments.
///
/// Immutable once built. The envelope builder borrows it once per
/// protocol and never keeps it.
///
/// ```rust
/// use hubcast_protocol::{InvocationMessage, Value};
///
/// let msg = InvocationMessage::new("newMessage", ["alice", "hello"]);
/// assert_eq!(msg.target(), "newMessage");
/// assert_eq!(msg.arguments()[1], Value::from("hello"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationMessage {
    target: String,
    arguments: Vec<Value>,
}

impl InvocationMessage {
    /// Creates an invocation of `target` with the given arguments.
    pub fn new<I>(target: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self {
            target: target.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    /// The method name clients should invoke.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Positional arguments, in call order.
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from_conversions() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(7_i32), Value::Integer(7));
        assert_eq!(Value::from(7_u32), Value::Integer(7));
        assert_eq!(Value::from(1.5), Value::Float(1.5));
        assert_eq!(Value::from("hi"), Value::String("hi".into()));
        assert_eq!(Value::from(vec![1_u8, 2]), Value::Binary(vec![1, 2]));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }

    #[test]
    fn test_value_serializes_through_serde_json() {
        let value = Value::Array(vec![
            Value::Null,
            Value::Bool(false),
            Value::Integer(-3),
            Value::String("s".into()),
            Value::Binary(vec![1, 2]),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"[null,false,-3,"s",[1,2]]"#);
    }

    #[test]
    fn test_map_keeps_entry_order() {
        let value = Value::Map(vec![
            (Value::from("z"), Value::from(1)),
            (Value::from("a"), Value::from(2)),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn test_non_string_map_key_is_rejected_by_serde_json() {
        let value = Value::Map(vec![(
            Value::Array(vec![Value::from(1)]),
            Value::from("v"),
        )]);
        assert!(serde_json::to_string(&value).is_err());
    }

    #[test]
    fn test_invocation_message_accessors() {
        let msg = InvocationMessage::new("target", ["argument"]);
        assert_eq!(msg.target(), "target");
        assert_eq!(msg.arguments(), &[Value::from("argument")]);
    }

    #[test]
    fn test_invocation_message_mixed_arguments() {
        let msg = InvocationMessage::new(
            "update",
            vec![Value::from(1), Value::from("two"), Value::Null],
        );
        assert_eq!(msg.arguments().len(), 3);
        assert!(msg.arguments()[2].is_null());
        assert_eq!(msg.arguments()[1].as_str(), Some("two"));
    }
}
