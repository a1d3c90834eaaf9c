//! Graph node descriptors.
//!
//! A [`GraphNode`] is the unit the mapper produces and the writer persists:
//! a label set, a globally unique [`NodeKey`] and a flat property map.
//! Placeholder nodes, which stand in for targets of unresolved logical
//! references, are a distinct type ([`PlaceholderKey`]) so that every
//! consumer has to handle them explicitly rather than sniffing for marker
//! properties.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker label carried by placeholder nodes in the graph store.
pub const UNRESOLVED_LABEL: &str = "Unresolved";

/// Global identity of a graph node: resource type (the primary label) plus
/// the server-assigned resource id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    pub resource_type: String,
    pub id: String,
}

impl NodeKey {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

/// Identity of a placeholder node: the expected resource type of the target
/// plus the identifier pair it was created for. Two unresolved references to
/// the same (system, value) share one placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaceholderKey {
    pub resource_type: String,
    pub system: String,
    pub value: String,
}

impl PlaceholderKey {
    pub fn new(
        resource_type: impl Into<String>,
        system: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            system: system.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for PlaceholderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}?identifier={}|{}",
            self.resource_type, self.system, self.value
        )
    }
}

/// A scalar or list value storable as a graph property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    TextList(Vec<String>),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        Self::TextList(value)
    }
}

/// Property name → value, ordered for deterministic output.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Name of the list property holding the node's preserved identifier
/// entries. Each entry is `system|value`; the resolve pass joins placeholder
/// nodes against this property.
pub const IDENTIFIERS_PROPERTY: &str = "identifiers";

/// Canonical `system|value` encoding of one identifier.
pub fn identifier_entry(system: &str, value: &str) -> String {
    format!("{system}|{value}")
}

/// A node descriptor produced by a resource mapper.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub key: NodeKey,
    /// Labels beyond the resource type, e.g. a profile-derived subtype.
    pub sublabels: Vec<String>,
    pub properties: PropertyMap,
}

impl GraphNode {
    pub fn new(key: NodeKey) -> Self {
        Self {
            key,
            sublabels: Vec::new(),
            properties: PropertyMap::new(),
        }
    }

    /// All labels of the node, primary label first.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels = vec![self.key.resource_type.as_str()];
        labels.extend(self.sublabels.iter().map(String::as_str));
        labels
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Records one declared identifier of the source resource. The entries
    /// accumulate in the [`IDENTIFIERS_PROPERTY`] list, preserving every
    /// identifier as the join key for the resolve pass.
    pub fn add_identifier(&mut self, system: &str, value: &str) {
        let entry = identifier_entry(system, value);
        match self.properties.get_mut(IDENTIFIERS_PROPERTY) {
            Some(PropertyValue::TextList(entries)) => {
                if !entries.contains(&entry) {
                    entries.push(entry);
                }
            }
            _ => {
                self.properties.insert(
                    IDENTIFIERS_PROPERTY.to_string(),
                    PropertyValue::TextList(vec![entry]),
                );
            }
        }
    }

    /// The preserved identifier entries of this node.
    pub fn identifiers(&self) -> &[String] {
        match self.properties.get(IDENTIFIERS_PROPERTY) {
            Some(PropertyValue::TextList(entries)) => entries.as_slice(),
            _ => &[],
        }
    }
}
