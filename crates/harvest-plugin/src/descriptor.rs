//! Plugin descriptors: one entry of the `plugins` configuration list.

use serde_json::{Map, Value};

use crate::error::PluginError;

/// Key naming the plugin in a descriptor.
pub const PLUGIN_KEY: &str = "plugin";

/// A validated plugin configuration entry.
///
/// The whole entry is kept so plugins can read `params` or any other key.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginDescriptor {
    id: String,
    raw: Map<String, Value>,
}

impl PluginDescriptor {
    /// Validates a raw configuration entry.
    ///
    /// The entry must be an object whose `plugin` key is a non-blank string.
    /// The identifier is kept exactly as written.
    pub fn from_value(value: &Value) -> Result<Self, PluginError> {
        let invalid = || PluginError::InvalidDescriptor {
            descriptor: value.to_string(),
        };

        let raw = value.as_object().ok_or_else(invalid)?;
        let id = raw
            .get(PLUGIN_KEY)
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(invalid)?;

        Ok(Self {
            id: id.to_string(),
            raw: raw.clone(),
        })
    }

    /// Plugin identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Any key of the entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    /// The `params` object, if present.
    pub fn params(&self) -> Option<&Map<String, Value>> {
        self.raw.get("params").and_then(Value::as_object)
    }

    /// A boolean parameter, `false` when absent or not a boolean.
    pub fn param_bool(&self, key: &str) -> bool {
        self.params()
            .and_then(|params| params.get(key))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// A string parameter.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params()
            .and_then(|params| params.get(key))
            .and_then(Value::as_str)
    }

    /// The entry as configured.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}
