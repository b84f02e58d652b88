//! The shared settings document (`config/argv.json`).
//!
//! A flat JSON object of runtime flags. Writers only touch the keys they own;
//! every other key round-trips verbatim, in its original position.

use crate::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// In-memory value of the settings document.
///
/// Mutating operations take this by value and hand it back, so the caller
/// decides when the result is persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsDocument(Map<String, Value>);

impl SettingsDocument {
    /// An empty map document.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Parse document text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidJson`] if the text is not JSON and
    /// [`SchemaError::NotAnObject`] if the top-level value is not an object.
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(map) => Ok(Self(map)),
            Value::Array(_) => Err(SchemaError::NotAnObject("an array")),
            Value::String(_) => Err(SchemaError::NotAnObject("a string")),
            Value::Number(_) => Err(SchemaError::NotAnObject("a number")),
            Value::Bool(_) => Err(SchemaError::NotAnObject("a boolean")),
            Value::Null => Err(SchemaError::NotAnObject("null")),
        }
    }

    /// Pretty-printed JSON with a trailing newline.
    pub fn to_pretty_string(&self) -> String {
        // A map of JSON values always serializes.
        let mut out = serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string());
        out.push('\n');
        out
    }

    /// Raw value for a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Boolean value for a key, `None` if missing or not a boolean.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// String value for a key, `None` if missing or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Integer value for a key, `None` if missing or not an integer.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    /// Insert or replace a key, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        // shift_remove keeps the order of the remaining keys intact
        self.0.shift_remove(key)
    }

    /// Whether a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the document has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
