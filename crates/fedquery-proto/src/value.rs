//! Runtime value types for filter operands and join keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A scalar (or list of scalars) used as a filter operand.
///
/// Values cross provider boundaries as plain JSON, so the enum is untagged:
/// `"active"`, `42`, `1.5`, `true`, `null` and `[1, 2]` all deserialize
/// directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// List of values, used by `$in`, `$notin` and `$between`.
    List(Vec<Value>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a list.
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow list elements. A scalar is treated as a one-element list.
    pub fn as_slice(&self) -> &[Value] {
        match self {
            Value::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }

    /// Convert to a hashable join key, if this value can identify a record.
    ///
    /// Floats, nulls and lists are never join keys.
    pub fn as_join_key(&self) -> Option<JoinKey> {
        match self {
            Value::Bool(b) => Some(JoinKey::Bool(*b)),
            Value::Int(i) => Some(JoinKey::Int(*i)),
            Value::String(s) => Some(JoinKey::String(s.clone())),
            _ => None,
        }
    }

    /// Convert a JSON value into a filter value.
    ///
    /// Objects have no scalar representation and map to `Null`.
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null | JsonValue::Object(_) => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
        }
    }

    /// Convert into a JSON value.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<JoinKey> for Value {
    fn from(key: JoinKey) -> Self {
        match key {
            JoinKey::Bool(b) => Value::Bool(b),
            JoinKey::Int(i) => Value::Int(i),
            JoinKey::String(s) => Value::String(s),
        }
    }
}

/// A hashable value identifying a record on one side of a join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JoinKey {
    /// Boolean key.
    Bool(bool),
    /// Integer key.
    Int(i64),
    /// String key (including UUIDs in text form).
    String(String),
}

impl JoinKey {
    /// Extract a join key from a JSON field value.
    pub fn from_json(json: &JsonValue) -> Option<Self> {
        match json {
            JsonValue::Bool(b) => Some(JoinKey::Bool(*b)),
            JsonValue::Number(n) => n.as_i64().map(JoinKey::Int),
            JsonValue::String(s) => Some(JoinKey::String(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKey::Bool(b) => write!(f, "{b}"),
            JoinKey::Int(i) => write!(f, "{i}"),
            JoinKey::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for JoinKey {
    fn from(v: i64) -> Self {
        JoinKey::Int(v)
    }
}

impl From<&str> for JoinKey {
    fn from(v: &str) -> Self {
        JoinKey::String(v.to_string())
    }
}
