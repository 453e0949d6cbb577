//! Read-only snapshot of host attributes
//!
//! A [`Node`] is what filters are evaluated against. Attributes are looked up
//! by dotted path (`"kernel.machine"`) or by segments (`&["kernel", "machine"]`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Attributes used when describing a node in diagnostics
pub const RESOLUTION_ATTRIBUTES: [&str; 4] = ["os", "platform", "platform_family", "platform_version"];

/// Immutable host attribute snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Node {
    attributes: Map<String, Value>,
}

impl Node {
    /// Create an empty node (matches only empty filters)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a node from a JSON object
    ///
    /// Returns `None` if the value is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(attributes) => Some(Self { attributes }),
            _ => None,
        }
    }

    /// Return a copy of this node with `path` set to `value`
    ///
    /// Intermediate maps are created as needed; a scalar in the way is replaced.
    pub fn with(mut self, path: &str, value: impl Into<Value>) -> Self {
        let segments: Vec<&str> = path.split('.').collect();
        insert_path(&mut self.attributes, &segments, value.into());
        self
    }

    /// Read an attribute by dotted path
    pub fn read(&self, path: &str) -> Option<&Value> {
        let segments: Vec<&str> = path.split('.').collect();
        self.read_path(&segments)
    }

    /// Read an attribute by path segments
    pub fn read_path(&self, segments: &[&str]) -> Option<&Value> {
        let (first, rest) = segments.split_first()?;
        let mut value = self.attributes.get(*first)?;
        for segment in rest {
            value = value.as_object()?.get(*segment)?;
        }
        Some(value)
    }

    /// Read a string attribute
    pub fn read_str(&self, path: &str) -> Option<&str> {
        self.read(path).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.attributes.clone())
    }

    /// Short description of the attributes that drive resolution
    pub fn summary(&self) -> String {
        let parts: Vec<String> = RESOLUTION_ATTRIBUTES
            .iter()
            .filter_map(|attr| self.read(attr).map(|v| format!("{attr}={}", display_value(v))))
            .collect();
        if parts.is_empty() {
            "a node with no platform attributes".to_string()
        } else {
            parts.join(" ")
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

fn insert_path(map: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            map.insert((*last).to_string(), value);
        }
        [first, rest @ ..] => {
            let entry = map
                .entry((*first).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                insert_path(inner, rest, value);
            }
        }
    }
}

/// Render a JSON scalar without quotes around strings
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_dotted_path() {
        let node = Node::new()
            .with("platform", "ubuntu")
            .with("kernel.machine", "x86_64");
        assert_eq!(node.read_str("platform"), Some("ubuntu"));
        assert_eq!(node.read_str("kernel.machine"), Some("x86_64"));
        assert_eq!(node.read_path(&["kernel", "machine"]), Some(&json!("x86_64")));
        assert!(node.read("kernel.release").is_none());
        assert!(node.read("platform.version").is_none());
    }

    #[test]
    fn test_with_replaces_scalar() {
        let node = Node::new().with("a", 1).with("a.b", 2);
        assert_eq!(node.read("a.b"), Some(&json!(2)));
    }

    #[test]
    fn test_from_value() {
        assert!(Node::from_value(json!({"os": "linux"})).is_some());
        assert!(Node::from_value(json!("linux")).is_none());
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            Node::new().summary(),
            "a node with no platform attributes"
        );
        let node = Node::new().with("os", "linux").with("platform", "foo");
        assert_eq!(node.summary(), "os=linux platform=foo");
    }
}
