//! FalkorDB client for the dbt knowledge graph

use super::reply::{parse_result_set, with_params, ResultSet};
use crate::graph::cypher::{self, CypherStatement};
use crate::graph::models::*;
use anyhow::{Context, Result};
use redis::aio::MultiplexedConnection;
use redis::IntoConnectionInfo;

/// Client for FalkorDB operations on one named graph
pub struct FalkorClient {
    conn: MultiplexedConnection,
    graph_name: String,
}

impl FalkorClient {
    /// Connect to FalkorDB. `user`/`password` override credentials embedded in
    /// the URL when non-empty.
    pub async fn new(url: &str, graph_name: &str, user: &str, password: &str) -> Result<Self> {
        let mut info = url
            .into_connection_info()
            .context("Invalid FalkorDB URL")?;
        if !user.is_empty() {
            info.redis.username = Some(user.to_string());
        }
        if !password.is_empty() {
            info.redis.password = Some(password.to_string());
        }

        let client = redis::Client::open(info).context("Invalid FalkorDB connection settings")?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to FalkorDB")?;

        Ok(Self {
            conn,
            graph_name: graph_name.to_string(),
        })
    }

    pub fn graph_name(&self) -> &str {
        &self.graph_name
    }

    /// Run a query against the graph (internal use only)
    pub(crate) async fn execute(&self, text: &str) -> Result<ResultSet> {
        let mut conn = self.conn.clone();
        let reply: redis::Value = redis::cmd("GRAPH.QUERY")
            .arg(&self.graph_name)
            .arg(text)
            .query_async(&mut conn)
            .await?;
        parse_result_set(reply)
    }

    /// Run a parameterized statement (internal use only)
    pub(crate) async fn execute_statement(&self, stmt: &CypherStatement) -> Result<ResultSet> {
        let text = with_params(&stmt.text, &stmt.params)?;
        self.execute(&text).await
    }

    pub async fn health_check(&self) -> Result<bool> {
        let rs = self.execute(cypher::HEALTH_CHECK).await?;
        Ok(rs.ints("ok")?.first() == Some(&1))
    }

    // ========================================================================
    // Schema operations
    // ========================================================================

    /// Delete every node and relationship. Indexes and constraints survive.
    pub async fn clear_graph(&self) -> Result<()> {
        self.execute(cypher::CLEAR_GRAPH)
            .await
            .context("Failed to clear graph")?;
        Ok(())
    }

    /// Unique constraint on `unique_id`. FalkorDB requires an exact-match index
    /// on the property before the constraint can be created.
    pub async fn create_unique_constraint(&self, label: NodeLabel) -> Result<()> {
        let index = format!("CREATE INDEX FOR (n:{}) ON (n.unique_id)", label.as_str());
        if let Err(e) = self.execute(&index).await {
            tracing::debug!("Index on {}.unique_id may already exist: {}", label, e);
        }

        let mut conn = self.conn.clone();
        let _: redis::Value = redis::cmd("GRAPH.CONSTRAINT")
            .arg("CREATE")
            .arg(&self.graph_name)
            .arg("UNIQUE")
            .arg("NODE")
            .arg(label.as_str())
            .arg("PROPERTIES")
            .arg(1)
            .arg("unique_id")
            .query_async(&mut conn)
            .await
            .with_context(|| format!("Failed to create constraint {}", label.constraint_name()))?;
        Ok(())
    }

    pub async fn create_property_index(&self, label: NodeLabel, property: &str) -> Result<()> {
        if !cypher::is_valid_property_key(property) {
            anyhow::bail!("Invalid property name for index: {}", property);
        }
        let index = format!("CREATE INDEX FOR (n:{}) ON (n.{})", label.as_str(), property);
        self.execute(&index)
            .await
            .with_context(|| format!("Failed to create index on {}.{}", label, property))?;
        Ok(())
    }

    // ========================================================================
    // Write operations
    // ========================================================================

    pub async fn upsert_node(&self, node: &GraphNode) -> Result<()> {
        let stmt = cypher::upsert_node(node)?;
        self.execute_statement(&stmt)
            .await
            .with_context(|| format!("Failed to upsert {} {}", node.label, node.unique_id))?;
        Ok(())
    }

    pub async fn upsert_edge(&self, edge: &EdgeSpec) -> Result<u64> {
        let stmt = cypher::upsert_edge(edge);
        let rs = self.execute_statement(&stmt).await.with_context(|| {
            format!(
                "Failed to upsert {} edge {} -> {}",
                edge.edge_type, edge.from, edge.to
            )
        })?;
        let linked = rs.ints("linked")?.first().copied().unwrap_or(0);
        Ok(linked.max(0) as u64)
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub async fn stats(&self) -> Result<GraphStats> {
        let mut stats = GraphStats::default();

        let rs = self.execute(cypher::NODE_COUNTS).await?;
        for (label, count) in rs.strings("label")?.into_iter().zip(rs.ints("count")?) {
            if let Some(label) = label {
                stats.nodes.insert(label, count.max(0) as u64);
            }
        }

        let rs = self.execute(cypher::RELATIONSHIP_COUNTS).await?;
        for (rel_type, count) in rs.strings("rel_type")?.into_iter().zip(rs.ints("count")?) {
            if let Some(rel_type) = rel_type {
                stats.relationships.insert(rel_type, count.max(0) as u64);
            }
        }

        Ok(stats)
    }
}
