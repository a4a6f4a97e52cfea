//! RawInput: whatever the user supplied, read-only

use super::fields::{number_field, str_field};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys that may carry the service name.
pub(crate) const SERVICE_KEYS: &[&str] = &["service_name", "service", "title"];
/// Keys that may carry the description.
pub(crate) const DESCRIPTION_KEYS: &[&str] = &["description", "about"];
/// Keys that may carry the audience.
pub(crate) const AUDIENCE_KEYS: &[&str] = &["target_audience", "audience"];
/// Keys that may carry the price.
pub(crate) const PRICE_KEYS: &[&str] = &["price", "pricing", "cost"];

/// Free-form user input: arbitrary keys, no required fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput(Map<String, Value>);

impl RawInput {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap any JSON value. Objects are taken as-is; a bare string becomes
    /// `{"description": ...}`; anything else yields an empty input.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            Value::String(text) => Self::new().with("description", text),
            _ => Self::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First non-empty text among `keys`.
    pub fn text(&self, keys: &[&str]) -> Option<String> {
        str_field(&self.0, keys)
    }

    /// Whether any of `keys` carries a non-null, non-empty value.
    pub fn has_any(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| match self.0.get(*k) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
            Some(_) => true,
        })
    }

    /// The price the user gave, from a number, a price-like string, or a
    /// `{"amount": ...}` object under any of the price keys.
    pub fn price_amount(&self) -> Option<f64> {
        PRICE_KEYS
            .iter()
            .filter_map(|k| self.0.get(*k))
            .find_map(|v| match v {
                Value::Object(obj) => obj.get("amount").and_then(number_field),
                other => number_field(other),
            })
    }
}

impl From<Map<String, Value>> for RawInput {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
