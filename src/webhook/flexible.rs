//! Flexible value decoding
//!
//! Paystack is not consistent about scalar types: a boolean may arrive as
//! `true`, `1` or `"true"`, and metadata is sometimes double-encoded as a
//! JSON string. Values are first classified into [`FlexibleScalar`] at the
//! decode boundary, then coerced by one function per target type.

use serde::de::{Deserializer, Error as _};
use serde::Deserialize;
use serde_json::{Number, Value};

use crate::webhook::error::CoercionError;
use crate::webhook::transaction::Metadata;

/// The scalar shapes a loosely typed field may take
#[derive(Debug, Clone, PartialEq)]
pub enum FlexibleScalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl TryFrom<Value> for FlexibleScalar {
    type Error = CoercionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Number(n) => Ok(Self::Number(n)),
            Value::String(s) => Ok(Self::String(s)),
            Value::Array(_) => Err(CoercionError::UnsupportedShape("an array")),
            Value::Object(_) => Err(CoercionError::UnsupportedShape("an object")),
        }
    }
}

impl<'de> Deserialize<'de> for FlexibleScalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::try_from(value).map_err(D::Error::custom)
    }
}

impl FlexibleScalar {
    /// Boolean view: numbers are true when non-zero, strings when they are
    /// `"true"` or `"1"` (case-insensitive). `Null` stays absent.
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(*b),
            Self::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
            Self::String(s) => Some(s.eq_ignore_ascii_case("true") || s == "1"),
        }
    }
}

/// Coerce a JSON value to an optional boolean
pub fn coerce_bool(value: &Value) -> Result<Option<bool>, CoercionError> {
    FlexibleScalar::try_from(value.clone()).map(|scalar| scalar.to_bool())
}

/// Coerce a JSON value to optional metadata
///
/// Never fails: blank strings, strings that are not JSON objects and any
/// other non-object shape decode to `None`.
pub fn coerce_metadata(value: &Value) -> Option<Metadata> {
    match value {
        Value::Object(map) => Some(Metadata::from(map.clone())),
        Value::String(text) if !text.trim().is_empty() => {
            match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => Some(Metadata::from(map)),
                Ok(_) => None,
                Err(e) => {
                    tracing::trace!(error = %e, "Ignoring metadata string that is not JSON");
                    None
                }
            }
        }
        _ => None,
    }
}

/// `deserialize_with` adapter for flexible booleans
pub fn deserialize_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(FlexibleScalar::deserialize(deserializer)?.to_bool())
}

/// `deserialize_with` adapter for flexible metadata
pub fn deserialize_metadata<'de, D>(deserializer: D) -> Result<Option<Metadata>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_metadata(&value))
}
