//! Module output and the ordered output map.

use aether_response::ResponseEnvelope;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a module produces when it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleOutput {
    /// Markup or plain text inserted into the template as-is.
    Text(String),
    /// Structured data for the template to iterate over.
    Data(Value),
}

impl ModuleOutput {
    /// Value handed to the template.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Data(value) => value.clone(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Data(_) => None,
        }
    }

    /// Envelope used when the output is returned on its own.
    pub fn into_envelope(self) -> ResponseEnvelope {
        match self {
            Self::Text(text) => ResponseEnvelope::text(text),
            Self::Data(value) => ResponseEnvelope::json(value),
        }
    }
}

impl From<String> for ModuleOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ModuleOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for ModuleOutput {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

/// Module outputs keyed by alias-or-name, in insertion order.
///
/// Inserting an existing key replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputMap {
    entries: Vec<(String, ModuleOutput)>,
}

impl OutputMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, output: ModuleOutput) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = output,
            None => self.entries.push((key, output)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ModuleOutput> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleOutput)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON object of every output, in insertion order.
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_value()))
            .collect();
        Value::Object(map)
    }
}
