//! In-memory mock implementation of GraphStore for testing.
//!
//! Honours MERGE semantics for nodes and edges, label + property selectors,
//! and per-label uniqueness constraints. Writes can be made to fail for a
//! chosen label or edge type to exercise partial-load paths.
//! Conditionally compiled with `#[cfg(test)]`.

use crate::graph::models::*;
use crate::graph::traits::GraphStore;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Identity of a stored node
pub type NodeKey = (NodeLabel, String);

/// In-memory mock implementation of GraphStore for testing.
pub struct MockGraphStore {
    pub nodes: RwLock<BTreeMap<NodeKey, PropertyBag>>,
    pub edges: RwLock<BTreeSet<(NodeKey, EdgeType, NodeKey)>>,
    pub constraints: RwLock<BTreeSet<NodeLabel>>,
    pub indexes: RwLock<BTreeSet<(NodeLabel, String)>>,

    // Failure injection
    fail_label: Option<NodeLabel>,
    fail_edge_type: Option<EdgeType>,

    // Call counters
    pub clear_calls: AtomicUsize,
    pub node_writes: AtomicUsize,
    pub edge_writes: AtomicUsize,
}

impl MockGraphStore {
    /// Create a new empty MockGraphStore.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
            edges: RwLock::new(BTreeSet::new()),
            constraints: RwLock::new(BTreeSet::new()),
            indexes: RwLock::new(BTreeSet::new()),
            fail_label: None,
            fail_edge_type: None,
            clear_calls: AtomicUsize::new(0),
            node_writes: AtomicUsize::new(0),
            edge_writes: AtomicUsize::new(0),
        }
    }

    /// Make every node upsert with this label fail.
    pub fn failing_on_label(mut self, label: NodeLabel) -> Self {
        self.fail_label = Some(label);
        self
    }

    /// Make every edge upsert of this type fail.
    pub fn failing_on_edge(mut self, edge_type: EdgeType) -> Self {
        self.fail_edge_type = Some(edge_type);
        self
    }

    /// Seed a node directly, bypassing failure injection.
    pub async fn with_node(self, label: NodeLabel, unique_id: &str, properties: PropertyBag) -> Self {
        let mut properties = properties;
        properties.insert("unique_id".into(), unique_id.into());
        self.nodes
            .write()
            .await
            .insert((label, unique_id.to_string()), properties);
        self
    }

    // ========================================================================
    // Inspection helpers
    // ========================================================================

    /// Properties of the node with this label and id.
    pub async fn node(&self, label: NodeLabel, unique_id: &str) -> Option<PropertyBag> {
        self.nodes
            .read()
            .await
            .get(&(label, unique_id.to_string()))
            .cloned()
    }

    /// Number of nodes carrying this label.
    pub async fn count_label(&self, label: NodeLabel) -> usize {
        self.nodes
            .read()
            .await
            .keys()
            .filter(|(l, _)| *l == label)
            .count()
    }

    /// Whether an edge `from -[edge_type]-> to` exists, matching ids across labels.
    pub async fn has_edge(&self, from_id: &str, edge_type: EdgeType, to_id: &str) -> bool {
        self.edges
            .read()
            .await
            .iter()
            .any(|(from, t, to)| *t == edge_type && from.1 == from_id && to.1 == to_id)
    }

    /// Number of edges of this type.
    pub async fn count_edges(&self, edge_type: EdgeType) -> usize {
        self.edges
            .read()
            .await
            .iter()
            .filter(|(_, t, _)| *t == edge_type)
            .count()
    }

    fn select(nodes: &BTreeMap<NodeKey, PropertyBag>, selector: &NodeSelector) -> Vec<NodeKey> {
        nodes
            .iter()
            .filter(|((label, _), props)| selector.matches(*label, props))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl Default for MockGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for MockGraphStore {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn clear_graph(&self) -> Result<()> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        self.edges.write().await.clear();
        self.nodes.write().await.clear();
        Ok(())
    }

    async fn create_unique_constraint(&self, label: NodeLabel) -> Result<()> {
        if !self.constraints.write().await.insert(label) {
            anyhow::bail!(
                "An equivalent constraint already exists: {}",
                label.constraint_name()
            );
        }
        Ok(())
    }

    async fn create_property_index(&self, label: NodeLabel, property: &str) -> Result<()> {
        if !self
            .indexes
            .write()
            .await
            .insert((label, property.to_string()))
        {
            anyhow::bail!("An equivalent index already exists: {}.{}", label, property);
        }
        Ok(())
    }

    async fn upsert_node(&self, node: &GraphNode) -> Result<()> {
        if self.fail_label == Some(node.label) {
            anyhow::bail!("Injected write failure for {}", node.unique_id);
        }
        self.node_writes.fetch_add(1, Ordering::SeqCst);
        let mut properties = node.properties.clone();
        properties.insert("unique_id".into(), node.unique_id.as_str().into());
        self.nodes
            .write()
            .await
            .insert((node.label, node.unique_id.clone()), properties);
        Ok(())
    }

    async fn upsert_edge(&self, edge: &EdgeSpec) -> Result<u64> {
        if self.fail_edge_type == Some(edge.edge_type) {
            anyhow::bail!("Injected write failure for {} edge", edge.edge_type);
        }
        self.edge_writes.fetch_add(1, Ordering::SeqCst);
        let nodes = self.nodes.read().await;
        let sources = Self::select(&nodes, &edge.from);
        let targets = Self::select(&nodes, &edge.to);
        drop(nodes);

        let mut edges = self.edges.write().await;
        let mut linked = 0;
        for from in &sources {
            for to in &targets {
                edges.insert((from.clone(), edge.edge_type, to.clone()));
                linked += 1;
            }
        }
        Ok(linked)
    }

    async fn stats(&self) -> Result<GraphStats> {
        let mut stats = GraphStats::default();
        for (label, _) in self.nodes.read().await.keys() {
            *stats.nodes.entry(label.as_str().to_string()).or_insert(0) += 1;
        }
        for (_, edge_type, _) in self.edges.read().await.iter() {
            *stats
                .relationships
                .entry(edge_type.as_str().to_string())
                .or_insert(0) += 1;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(label: NodeLabel, id: &str, name: &str) -> GraphNode {
        let mut properties = PropertyBag::new();
        properties.insert("name".into(), name.into());
        GraphNode {
            label,
            unique_id: id.into(),
            properties,
        }
    }

    #[tokio::test]
    async fn test_edge_merge_is_idempotent() {
        let store = MockGraphStore::new();
        store.upsert_node(&node(NodeLabel::Model, "model.a.x", "x")).await.unwrap();
        store.upsert_node(&node(NodeLabel::Model, "model.a.y", "y")).await.unwrap();

        let edge = EdgeSpec::new(
            NodeSelector::by_id("model.a.x"),
            EdgeType::DependsOn,
            NodeSelector::by_id("model.a.y"),
        );
        assert_eq!(store.upsert_edge(&edge).await.unwrap(), 1);
        assert_eq!(store.upsert_edge(&edge).await.unwrap(), 1);
        assert_eq!(store.count_edges(EdgeType::DependsOn).await, 1);
    }

    #[tokio::test]
    async fn test_unresolved_endpoint_links_nothing() {
        let store = MockGraphStore::new();
        store.upsert_node(&node(NodeLabel::Model, "model.a.x", "x")).await.unwrap();
        let edge = EdgeSpec::new(
            NodeSelector::by_id("model.a.x"),
            EdgeType::References,
            NodeSelector::named(NodeLabel::Model, "missing"),
        );
        assert_eq!(store.upsert_edge(&edge).await.unwrap(), 0);
        assert_eq!(store.stats().await.unwrap().total_relationships(), 0);
    }

    #[tokio::test]
    async fn test_upsert_replaces_property_bag() {
        let store = MockGraphStore::new();
        let mut first = node(NodeLabel::Seed, "seed.a.s", "s");
        first.properties.insert("delimiter".into(), ";".into());
        store.upsert_node(&first).await.unwrap();
        store.upsert_node(&node(NodeLabel::Seed, "seed.a.s", "s")).await.unwrap();

        let props = store.node(NodeLabel::Seed, "seed.a.s").await.unwrap();
        assert!(!props.contains_key("delimiter"));
        assert_eq!(store.count_label(NodeLabel::Seed).await, 1);
    }

    #[tokio::test]
    async fn test_second_constraint_fails() {
        let store = MockGraphStore::new();
        assert!(store.create_unique_constraint(NodeLabel::Model).await.is_ok());
        assert!(store.create_unique_constraint(NodeLabel::Model).await.is_err());
    }
}
