//! Entity records exchanged with collection providers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::Error;
use crate::value::{JoinKey, Value};

/// A single record returned by a provider.
///
/// Entities are schemaless JSON objects. Providers never see relation
/// properties; those are attached by the federation layer after fetching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, JsonValue>);

impl Entity {
    /// Create an empty entity.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build an entity from a JSON value, which must be an object.
    pub fn from_json(json: JsonValue) -> Result<Self, Error> {
        match json {
            JsonValue::Object(map) => Ok(Self(map)),
            other => Err(Error::InvalidEntity(format!(
                "expected JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Set a field, returning the entity for chaining.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Set a field in place.
    pub fn set(&mut self, field: impl Into<String>, value: JsonValue) {
        self.0.insert(field.into(), value);
    }

    /// Raw JSON value of a field.
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.0.get(field)
    }

    /// Field value as a filter value. Missing fields read as `Null`.
    pub fn value(&self, field: &str) -> Value {
        self.0.get(field).map(Value::from_json).unwrap_or(Value::Null)
    }

    /// Field value as a join key, if present and usable as one.
    pub fn join_key(&self, field: &str) -> Option<JoinKey> {
        self.0.get(field).and_then(JoinKey::from_json)
    }

    /// Check whether the field is present (even if null).
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Stable textual identity of the record contents.
    ///
    /// Keys are ordered, so two equal entities always produce the same
    /// fingerprint regardless of insertion order.
    pub fn fingerprint(&self) -> String {
        let ordered: std::collections::BTreeMap<&String, &JsonValue> = self.0.iter().collect();
        serde_json::to_string(&ordered).unwrap_or_default()
    }

    /// Borrow the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    /// Convert into a JSON value.
    pub fn into_json(self) -> JsonValue {
        JsonValue::Object(self.0)
    }
}

impl From<Map<String, JsonValue>> for Entity {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }
}

impl TryFrom<JsonValue> for Entity {
    type Error = Error;

    fn try_from(json: JsonValue) -> Result<Self, Self::Error> {
        Entity::from_json(json)
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_from_json() {
        let entity = Entity::from_json(json!({"id": 1, "name": "Alice"})).unwrap();
        assert_eq!(entity.value("id"), Value::Int(1));
        assert_eq!(entity.value("missing"), Value::Null);
        assert_eq!(entity.join_key("id"), Some(JoinKey::Int(1)));

        let err = Entity::from_json(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_fingerprint_ignores_insertion_order() {
        let a = Entity::new().with("id", 1).with("title", "x");
        let b = Entity::new().with("title", "x").with("id", 1);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
