//! `GraphStore` implementation for `Neo4jClient`.
//!
//! Every method simply delegates to the corresponding inherent method on `Neo4jClient`.

use async_trait::async_trait;

use super::client::Neo4jClient;
use crate::graph::models::*;
use crate::graph::traits::GraphStore;

#[async_trait]
impl GraphStore for Neo4jClient {
    fn backend_name(&self) -> &'static str {
        "neo4j"
    }

    async fn health_check(&self) -> anyhow::Result<bool> {
        self.health_check().await
    }

    // ========================================================================
    // Schema operations
    // ========================================================================

    async fn clear_graph(&self) -> anyhow::Result<()> {
        self.clear_graph().await
    }

    async fn create_unique_constraint(&self, label: NodeLabel) -> anyhow::Result<()> {
        self.create_unique_constraint(label).await
    }

    async fn create_property_index(&self, label: NodeLabel, property: &str) -> anyhow::Result<()> {
        self.create_property_index(label, property).await
    }

    // ========================================================================
    // Write operations
    // ========================================================================

    async fn upsert_node(&self, node: &GraphNode) -> anyhow::Result<()> {
        self.upsert_node(node).await
    }

    async fn upsert_edge(&self, edge: &EdgeSpec) -> anyhow::Result<u64> {
        self.upsert_edge(edge).await
    }

    // ========================================================================
    // Read operations
    // ========================================================================

    async fn stats(&self) -> anyhow::Result<GraphStats> {
        self.stats().await
    }
}
