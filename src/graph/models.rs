//! Backend-neutral graph model: node labels, edge types, property values,
//! endpoint selectors and aggregate statistics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Labels and relationship types
// ============================================================================

/// Label of a persisted node, one per dbt resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeLabel {
    Model,
    Source,
    Seed,
    Snapshot,
    Test,
    Macro,
    Operation,
}

impl NodeLabel {
    /// Every label, in the order constraints are installed.
    pub const ALL: [NodeLabel; 7] = [
        NodeLabel::Model,
        NodeLabel::Source,
        NodeLabel::Test,
        NodeLabel::Macro,
        NodeLabel::Operation,
        NodeLabel::Seed,
        NodeLabel::Snapshot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Model => "Model",
            NodeLabel::Source => "Source",
            NodeLabel::Seed => "Seed",
            NodeLabel::Snapshot => "Snapshot",
            NodeLabel::Test => "Test",
            NodeLabel::Macro => "Macro",
            NodeLabel::Operation => "Operation",
        }
    }

    /// Name used for the uniqueness constraint on `unique_id`
    /// (e.g. "model_unique").
    pub fn constraint_name(&self) -> String {
        format!("{}_unique", self.as_str().to_lowercase())
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship type between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeType {
    /// Structural dependency (parent map) and node → source dependency
    DependsOn,
    /// Node → model reference resolved by name/package/version
    References,
    /// Node → macro usage
    UsesMacro,
    /// Test → tested node
    Tests,
}

impl EdgeType {
    pub const ALL: [EdgeType; 4] = [
        EdgeType::DependsOn,
        EdgeType::References,
        EdgeType::UsesMacro,
        EdgeType::Tests,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::DependsOn => "DEPENDS_ON",
            EdgeType::References => "REFERENCES",
            EdgeType::UsesMacro => "USES_MACRO",
            EdgeType::Tests => "TESTS",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Properties
// ============================================================================

/// A property value the target stores can hold natively.
///
/// Nested documents never appear here: they are encoded to JSON text
/// before they reach the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    StringList(Vec<String>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        PropertyValue::StringList(value)
    }
}

/// Flat property bag of one node. Ordered so that the same record always
/// produces the same write.
pub type PropertyBag = BTreeMap<String, PropertyValue>;

/// A node ready to be upserted: label, identity and full property bag.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub label: NodeLabel,
    pub unique_id: String,
    pub properties: PropertyBag,
}

// ============================================================================
// Edge endpoints
// ============================================================================

/// Property keys an endpoint can be resolved by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchKey {
    UniqueId,
    Name,
    PackageName,
    Version,
}

impl MatchKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKey::UniqueId => "unique_id",
            MatchKey::Name => "name",
            MatchKey::PackageName => "package_name",
            MatchKey::Version => "version",
        }
    }
}

/// Describes how to find the node(s) at one end of an edge: an optional label
/// plus a conjunction of exact property matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeSelector {
    pub label: Option<NodeLabel>,
    pub filters: Vec<(MatchKey, String)>,
}

impl NodeSelector {
    /// Any node, whatever its label, with this `unique_id`.
    pub fn by_id(unique_id: impl Into<String>) -> Self {
        Self {
            label: None,
            filters: vec![(MatchKey::UniqueId, unique_id.into())],
        }
    }

    /// A node of the given label with this `unique_id`.
    pub fn labeled(label: NodeLabel, unique_id: impl Into<String>) -> Self {
        Self {
            label: Some(label),
            filters: vec![(MatchKey::UniqueId, unique_id.into())],
        }
    }

    /// Nodes of the given label whose `name` equals `name`.
    pub fn named(label: NodeLabel, name: impl Into<String>) -> Self {
        Self {
            label: Some(label),
            filters: vec![(MatchKey::Name, name.into())],
        }
    }

    /// Add another conjunctive predicate.
    pub fn and(mut self, key: MatchKey, value: impl Into<String>) -> Self {
        self.filters.push((key, value.into()));
        self
    }

    /// True when `label`/`properties` satisfy every predicate.
    pub fn matches(&self, label: NodeLabel, properties: &PropertyBag) -> bool {
        if let Some(wanted) = self.label {
            if wanted != label {
                return false;
            }
        }
        self.filters.iter().all(|(key, value)| {
            properties
                .get(key.as_str())
                .and_then(PropertyValue::as_str)
                .is_some_and(|actual| actual == value)
        })
    }
}

impl fmt::Display for NodeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = self.label {
            write!(f, "{}", label)?;
        } else {
            f.write_str("*")?;
        }
        let filters: Vec<String> = self
            .filters
            .iter()
            .map(|(k, v)| format!("{}={}", k.as_str(), v))
            .collect();
        write!(f, "{{{}}}", filters.join(", "))
    }
}

/// An edge to MERGE between every pair of nodes matched by `from` and `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeSpec {
    pub from: NodeSelector,
    pub edge_type: EdgeType,
    pub to: NodeSelector,
}

impl EdgeSpec {
    pub fn new(from: NodeSelector, edge_type: EdgeType, to: NodeSelector) -> Self {
        Self {
            from,
            edge_type,
            to,
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Node counts by label and relationship counts by type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: BTreeMap<String, u64>,
    pub relationships: BTreeMap<String, u64>,
}

impl GraphStats {
    pub fn total_nodes(&self) -> u64 {
        self.nodes.values().sum()
    }

    pub fn total_relationships(&self) -> u64 {
        self.relationships.values().sum()
    }

    pub fn node_count(&self, label: NodeLabel) -> u64 {
        self.nodes.get(label.as_str()).copied().unwrap_or(0)
    }

    pub fn relationship_count(&self, edge_type: EdgeType) -> u64 {
        self.relationships
            .get(edge_type.as_str())
            .copied()
            .unwrap_or(0)
    }
}
