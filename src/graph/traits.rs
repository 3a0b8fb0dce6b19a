//! GraphStore trait definition
//!
//! Defines the capability interface the loader needs from a graph backend.
//! `Neo4jClient` and `FalkorClient` both implement it, and the test-only
//! `MockGraphStore` implements it in memory.

use crate::graph::models::*;
use anyhow::Result;
use async_trait::async_trait;

/// Abstract interface for all graph database operations used by the loader.
///
/// Every call is an independent request against the backend: there is no
/// transaction spanning several calls.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Short backend name for logs ("neo4j", "falkordb", ...)
    fn backend_name(&self) -> &'static str;

    /// Check the backend answers queries
    async fn health_check(&self) -> Result<bool>;

    // ========================================================================
    // Schema operations
    // ========================================================================

    /// Delete every node and relationship in the graph
    async fn clear_graph(&self) -> Result<()>;

    /// Create a uniqueness constraint on `unique_id` for a label.
    ///
    /// May fail when the constraint already exists; callers decide whether
    /// that is fatal.
    async fn create_unique_constraint(&self, label: NodeLabel) -> Result<()>;

    /// Create a non-unique lookup index on one property of a label
    async fn create_property_index(&self, label: NodeLabel, property: &str) -> Result<()>;

    // ========================================================================
    // Write operations
    // ========================================================================

    /// Match-or-create the node by (label, unique_id) and replace its
    /// property bag with `node.properties`
    async fn upsert_node(&self, node: &GraphNode) -> Result<()>;

    /// MERGE `edge.edge_type` between every pair of nodes matched by the two
    /// selectors. Returns the number of matched pairs (0 when an endpoint
    /// cannot be resolved).
    async fn upsert_edge(&self, edge: &EdgeSpec) -> Result<u64>;

    // ========================================================================
    // Read operations
    // ========================================================================

    /// Node counts by label and relationship counts by type
    async fn stats(&self) -> Result<GraphStats>;
}
