//! Object serializers: how the JSON protocol renders argument values.
//!
//! The JSON hub protocol owns the outer message shape (`type`, `target`,
//! record separator). The arguments array is handed to an
//! [`ObjectSerializer`], which can be swapped without changing the
//! protocol's name. Clients keep negotiating `"json"`; only the way values
//! such as binary data or maps are rendered changes.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::ser::Error as _;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::Value;

/// Renders an argument list as a JSON array.
pub trait ObjectSerializer: fmt::Debug + Send + Sync + 'static {
    /// Stable name of this strategy, used in diagnostics and configuration.
    fn name(&self) -> &'static str;

    /// Appends `arguments` to `out` as a JSON array.
    ///
    /// `indent` is the number of spaces per nesting level, or `None` for
    /// compact output.
    ///
    /// # Errors
    /// Fails if a value has no JSON representation under this strategy.
    fn write_arguments(
        &self,
        arguments: &[Value],
        indent: Option<usize>,
        out: &mut Vec<u8>,
    ) -> serde_json::Result<()>;
}

/// Writes `value` as JSON, compact or indented.
fn write_json<T: Serialize + ?Sized>(
    value: &T,
    indent: Option<usize>,
    out: &mut Vec<u8>,
) -> serde_json::Result<()> {
    match indent {
        None => serde_json::to_writer(out, value),
        Some(width) => {
            let indent = vec![b' '; width];
            let formatter = PrettyFormatter::with_indent(&indent);
            let mut ser = serde_json::Serializer::with_formatter(out, formatter);
            value.serialize(&mut ser)
        }
    }
}

// ---------------------------------------------------------------------------
// SerdeJsonSerializer
// ---------------------------------------------------------------------------

/// The default strategy: values go straight through `serde_json`.
///
/// - `Binary` becomes an array of byte values.
/// - Map keys must be strings (integers are quoted by serde_json);
///   anything else fails the message.
/// - Non-finite floats become `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeJsonSerializer;

impl ObjectSerializer for SerdeJsonSerializer {
    fn name(&self) -> &'static str {
        "serde_json"
    }

    fn write_arguments(
        &self,
        arguments: &[Value],
        indent: Option<usize>,
        out: &mut Vec<u8>,
    ) -> serde_json::Result<()> {
        write_json(arguments, indent, out)
    }
}

// ---------------------------------------------------------------------------
// CanonicalJsonSerializer
// ---------------------------------------------------------------------------

/// Alternate strategy producing canonical JSON.
///
/// - `Binary` becomes a standard base64 string.
/// - Map keys are rendered as strings and sorted; scalar keys are
///   stringified, array and map keys are rejected. When two keys render
///   to the same string, the later entry wins.
/// - Non-finite floats are rejected instead of silently becoming `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalJsonSerializer;

impl CanonicalJsonSerializer {
    fn convert(value: &Value) -> serde_json::Result<serde_json::Value> {
        Ok(match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| {
                    serde_json::Error::custom(format!(
                        "float {f} has no JSON representation"
                    ))
                })?,
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Binary(bytes) => serde_json::Value::String(STANDARD.encode(bytes)),
            Value::Array(items) => serde_json::Value::Array(
                items.iter().map(Self::convert).collect::<Result<_, _>>()?,
            ),
            Value::Map(entries) => {
                let mut pairs = entries
                    .iter()
                    .map(|(k, v)| Ok((Self::key(k)?, Self::convert(v)?)))
                    .collect::<serde_json::Result<Vec<_>>>()?;
                // Stable sort: equal keys keep their order, so the later
                // entry is inserted last and wins.
                pairs.sort_by(|(a, _), (b, _)| a.cmp(b));
                serde_json::Value::Object(pairs.into_iter().collect())
            }
        })
    }

    fn key(key: &Value) -> serde_json::Result<String> {
        match key {
            Value::String(s) => Ok(s.clone()),
            Value::Null => Ok("null".to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) if f.is_finite() => Ok(f.to_string()),
            Value::Float(f) => Err(serde_json::Error::custom(format!(
                "float key {f} has no JSON representation"
            ))),
            Value::Binary(bytes) => Ok(STANDARD.encode(bytes)),
            Value::Array(_) | Value::Map(_) => Err(serde_json::Error::custom(
                "map key must be a scalar value",
            )),
        }
    }
}

impl ObjectSerializer for CanonicalJsonSerializer {
    fn name(&self) -> &'static str {
        "canonical_json"
    }

    fn write_arguments(
        &self,
        arguments: &[Value],
        indent: Option<usize>,
        out: &mut Vec<u8>,
    ) -> serde_json::Result<()> {
        let converted = arguments
            .iter()
            .map(Self::convert)
            .collect::<serde_json::Result<Vec<_>>>()?;
        write_json(&converted, indent, out)
    }
}
