//! Neo4j client for the dbt knowledge graph

use crate::graph::cypher::{self, CypherStatement};
use crate::graph::models::*;
use anyhow::{Context, Result};
use neo4rs::{query, BoltType, Graph, Query};
use std::sync::Arc;

/// Client for Neo4j operations
pub struct Neo4jClient {
    graph: Arc<Graph>,
}

impl From<PropertyValue> for BoltType {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::String(s) => BoltType::from(s),
            PropertyValue::Integer(i) => BoltType::from(i),
            PropertyValue::Float(f) => BoltType::from(f),
            PropertyValue::Boolean(b) => BoltType::from(b),
            PropertyValue::StringList(list) => BoltType::from(list),
        }
    }
}

/// Build a bolt query from a shared Cypher statement
fn to_query(stmt: CypherStatement) -> Query {
    stmt.params
        .into_iter()
        .fold(query(&stmt.text), |q, (key, value)| {
            q.param(&key, BoltType::from(value))
        })
}

impl Neo4jClient {
    /// Create a new Neo4j client.
    ///
    /// No schema is installed here: constraints are (re)created by the loader
    /// on every load.
    pub async fn new(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .context("Failed to connect to Neo4j")?;

        Ok(Self {
            graph: Arc::new(graph),
        })
    }

    /// Execute a raw Cypher query (internal use only)
    pub(crate) async fn execute(&self, cypher: &str) -> Result<Vec<neo4rs::Row>> {
        let mut result = self.graph.execute(query(cypher)).await?;
        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a parameterized Cypher query (internal use only)
    pub(crate) async fn execute_with_params(&self, q: Query) -> Result<Vec<neo4rs::Row>> {
        let mut result = self.graph.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    pub async fn health_check(&self) -> Result<bool> {
        let rows = self.execute(cypher::HEALTH_CHECK).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get::<i64>("ok").ok())
            .is_some_and(|ok| ok == 1))
    }

    // ========================================================================
    // Schema operations
    // ========================================================================

    /// Delete every node and relationship
    pub async fn clear_graph(&self) -> Result<()> {
        self.graph
            .run(query(cypher::CLEAR_GRAPH))
            .await
            .context("Failed to clear graph")?;
        Ok(())
    }

    /// `CREATE CONSTRAINT model_unique FOR (n:Model) REQUIRE n.unique_id IS UNIQUE`
    ///
    /// Deliberately without `IF NOT EXISTS`: a second creation fails and the
    /// caller decides whether that matters.
    pub async fn create_unique_constraint(&self, label: NodeLabel) -> Result<()> {
        let cypher = format!(
            "CREATE CONSTRAINT {} FOR (n:{}) REQUIRE n.unique_id IS UNIQUE",
            label.constraint_name(),
            label.as_str()
        );
        self.graph
            .run(query(&cypher))
            .await
            .with_context(|| format!("Failed to create constraint {}", label.constraint_name()))?;
        Ok(())
    }

    /// `CREATE INDEX model_name IF NOT EXISTS FOR (n:Model) ON (n.name)`
    pub async fn create_property_index(&self, label: NodeLabel, property: &str) -> Result<()> {
        if !cypher::is_valid_property_key(property) {
            anyhow::bail!("Invalid property name for index: {}", property);
        }
        let cypher = format!(
            "CREATE INDEX {label_lc}_{property} IF NOT EXISTS FOR (n:{label}) ON (n.{property})",
            label_lc = label.as_str().to_lowercase(),
            label = label.as_str(),
            property = property
        );
        self.graph
            .run(query(&cypher))
            .await
            .with_context(|| format!("Failed to create index on {}.{}", label, property))?;
        Ok(())
    }

    // ========================================================================
    // Write operations
    // ========================================================================

    /// MERGE a node by (label, unique_id) and replace its properties
    pub async fn upsert_node(&self, node: &GraphNode) -> Result<()> {
        let stmt = cypher::upsert_node(node)?;
        self.graph
            .run(to_query(stmt))
            .await
            .with_context(|| format!("Failed to upsert {} {}", node.label, node.unique_id))?;
        Ok(())
    }

    /// MERGE an edge between every pair of matching endpoints
    pub async fn upsert_edge(&self, edge: &EdgeSpec) -> Result<u64> {
        let stmt = cypher::upsert_edge(edge);
        let rows = self
            .execute_with_params(to_query(stmt))
            .await
            .with_context(|| {
                format!(
                    "Failed to upsert {} edge {} -> {}",
                    edge.edge_type, edge.from, edge.to
                )
            })?;

        let linked = match rows.first() {
            Some(row) => row.get::<i64>("linked")?,
            None => 0,
        };
        Ok(linked.max(0) as u64)
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Node counts by label and relationship counts by type
    pub async fn stats(&self) -> Result<GraphStats> {
        let mut stats = GraphStats::default();

        for row in self.execute(cypher::NODE_COUNTS).await? {
            let Ok(label) = row.get::<String>("label") else {
                // Unlabeled nodes
                continue;
            };
            let count: i64 = row.get("count")?;
            stats.nodes.insert(label, count.max(0) as u64);
        }

        for row in self.execute(cypher::RELATIONSHIP_COUNTS).await? {
            let rel_type: String = row.get("rel_type")?;
            let count: i64 = row.get("count")?;
            stats.relationships.insert(rel_type, count.max(0) as u64);
        }

        Ok(stats)
    }
}
