use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::number::write_float;

/// Attribute value attached to a measurement.
///
/// Instrumentation code can tag measurements with strings, integers, floats or booleans.
/// The value is turned into label text only when the adapter canonicalizes the attribute set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean value, rendered as `true` / `false`.
    Bool(bool),
    /// Signed integer, rendered as plain decimal text.
    I64(i64),
    /// Floating point value, rendered with the shortest decimal representation.
    F64(f64),
    /// UTF-8 text, passed through unchanged.
    Str(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(v) => f.write_str(if *v { "true" } else { "false" }),
            AttributeValue::I64(v) => write!(f, "{v}"),
            AttributeValue::F64(v) => write_float(f, *v),
            AttributeValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::I64(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::I64(v.into())
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        AttributeValue::I64(v.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::F64(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Str(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Str(v)
    }
}

/// Raw key–value pair reported with a measurement.
///
/// The key is free-form text: it may contain punctuation, mixed case or repeat within one set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    key: String,
    value: AttributeValue,
}

impl Attribute {
    /// Create a new attribute.
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Get the raw key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the value.
    pub fn value(&self) -> &AttributeValue {
        &self.value
    }
}

impl<K, V> From<(K, V)> for Attribute
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}
