//! Node tree data model
//!
//! The minimal slice of the content-repository item model the tool needs:
//! named nodes with ordered children and typed, possibly multi-valued
//! properties. Values are kept in canonical string form; binary values are
//! base64-encoded.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of every workspace root node
pub const ROOT_NODE: &str = "jcr:root";

/// Reserved, engine-maintained subtree never touched by clear/import
pub const SYSTEM_NODE: &str = "jcr:system";

/// Property carrying a node's identity for collision detection
pub const UUID_PROPERTY: &str = "jcr:uuid";

/// A node in the repository tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Property>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

/// A typed, possibly multi-valued property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub ptype: PropertyType,
    pub values: Vec<String>,
}

/// Property types preserved by the system view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    String,
    Binary,
    Long,
    Double,
    Date,
    Boolean,
    Name,
    Reference,
}

impl PropertyType {
    /// Type name as written in the `sv:type` attribute
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Binary => "Binary",
            Self::Long => "Long",
            Self::Double => "Double",
            Self::Date => "Date",
            Self::Boolean => "Boolean",
            Self::Name => "Name",
            Self::Reference => "Reference",
        }
    }

    /// Parse an `sv:type` attribute value
    pub fn from_str(name: &str) -> Option<Self> {
        match name {
            "String" => Some(Self::String),
            "Binary" => Some(Self::Binary),
            "Long" => Some(Self::Long),
            "Double" => Some(Self::Double),
            "Date" => Some(Self::Date),
            "Boolean" => Some(Self::Boolean),
            "Name" => Some(Self::Name),
            "Reference" => Some(Self::Reference),
            _ => None,
        }
    }
}

impl Property {
    /// Single-valued property of the given type
    pub fn new(ptype: PropertyType, value: impl Into<String>) -> Self {
        Self {
            ptype,
            values: vec![value.into()],
        }
    }

    /// Multi-valued property of the given type
    pub fn multi(ptype: PropertyType, values: Vec<String>) -> Self {
        Self { ptype, values }
    }

    /// Single-valued string property
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(PropertyType::String, value)
    }

    /// Binary property, stored base64-encoded
    pub fn binary(bytes: &[u8]) -> Self {
        Self::new(PropertyType::Binary, BASE64.encode(bytes))
    }

    /// First value, if any
    pub fn first(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

impl Node {
    /// Create an empty node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Create the initial tree of a fresh workspace: a root with the
    /// reserved system subtree already in place
    pub fn new_workspace_root() -> Self {
        let mut root = Self::new(ROOT_NODE);
        root.children.push(Self::new(SYSTEM_NODE));
        root
    }

    /// This node's identity, when it carries one
    pub fn uuid(&self) -> Option<&str> {
        self.properties.get(UUID_PROPERTY).and_then(Property::first)
    }

    /// Direct child by name
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Remove the first direct child with the given name
    pub fn remove_child(&mut self, name: &str) -> bool {
        match self.children.iter().position(|c| c.name == name) {
            Some(index) => {
                self.children.remove(index);
                true
            }
            None => false,
        }
    }

    /// Resolve an absolute path like `/content/jobs` against this root.
    /// `/` resolves to the root itself.
    pub fn node_at_path(&self, path: &str) -> Option<&Node> {
        let mut current = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Mutable variant of [`Node::node_at_path`]
    pub fn node_at_path_mut(&mut self, path: &str) -> Option<&mut Node> {
        let mut current = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current.children.iter_mut().find(|c| c.name == segment)?;
        }
        Some(current)
    }

    /// Whether any node in this subtree carries the given identity
    pub fn contains_uuid(&self, uuid: &str) -> bool {
        if self.uuid() == Some(uuid) {
            return true;
        }
        self.children.iter().any(|c| c.contains_uuid(uuid))
    }

    /// Remove the node with the given identity anywhere in this subtree.
    /// The root itself is never removed.
    pub fn remove_by_uuid(&mut self, uuid: &str) -> bool {
        if let Some(index) = self.children.iter().position(|c| c.uuid() == Some(uuid)) {
            self.children.remove(index);
            return true;
        }
        self.children.iter_mut().any(|c| c.remove_by_uuid(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Node {
        let mut root = Node::new_workspace_root();
        let mut content = Node::new("content");
        content
            .properties
            .insert("title".to_string(), Property::string("Hello"));
        let mut jobs = Node::new("jobs");
        jobs.properties.insert(
            UUID_PROPERTY.to_string(),
            Property::string("13543fc6-1abf-4708-8268-143b59ee1528"),
        );
        content.children.push(jobs);
        root.children.push(content);
        root
    }

    #[test]
    fn test_fresh_workspace_has_system_node() {
        let root = Node::new_workspace_root();
        assert_eq!(root.name, ROOT_NODE);
        assert!(root.child(SYSTEM_NODE).is_some());
    }

    #[test]
    fn test_path_resolution() {
        let root = sample_tree();
        assert_eq!(root.node_at_path("/").unwrap().name, ROOT_NODE);
        assert_eq!(root.node_at_path("/content").unwrap().name, "content");
        assert_eq!(root.node_at_path("/content/jobs").unwrap().name, "jobs");
        assert!(root.node_at_path("/missing").is_none());
    }

    #[test]
    fn test_remove_by_uuid() {
        let mut root = sample_tree();
        assert!(root.contains_uuid("13543fc6-1abf-4708-8268-143b59ee1528"));
        assert!(root.remove_by_uuid("13543fc6-1abf-4708-8268-143b59ee1528"));
        assert!(!root.contains_uuid("13543fc6-1abf-4708-8268-143b59ee1528"));
        assert!(!root.remove_by_uuid("13543fc6-1abf-4708-8268-143b59ee1528"));
    }

    #[test]
    fn test_binary_property_is_base64() {
        let prop = Property::binary(b"\x00\x01\x02");
        assert_eq!(prop.ptype, PropertyType::Binary);
        assert_eq!(prop.first(), Some("AAEC"));
    }

    #[test]
    fn test_workspace_json_round_trip() {
        let root = sample_tree();
        let json = serde_json::to_string(&root).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(root, back);
    }
}
