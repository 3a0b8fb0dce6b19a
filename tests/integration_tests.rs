//! Integration tests against live graph databases
//!
//! Each load wipes the target graph. Point these at a scratch database:
//! - Neo4j: NEO4J_URI / GRAPH_USER_NEO4J / GRAPH_PASSWORD_NEO4J
//! - FalkorDB: FALKORDB_URL (graph `dbt_graph_it`)
//!
//! Tests skip themselves when the backend is unreachable.
//! Run with: cargo test --test integration_tests

use dbt_knowledge_graph::falkordb::FalkorClient;
use dbt_knowledge_graph::graph::{EdgeType, GraphStore, NodeLabel};
use dbt_knowledge_graph::loader::{DbtGraphLoader, LoadError, LoadOptions, LoadPhase, Wirer};
use dbt_knowledge_graph::neo4j::Neo4jClient;
use std::path::PathBuf;
use std::sync::Arc;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

async fn neo4j_store() -> Option<Arc<dyn GraphStore>> {
    let uri = std::env::var("NEO4J_URI").unwrap_or_else(|_| "bolt://localhost:7687".into());
    let user = std::env::var("GRAPH_USER_NEO4J").unwrap_or_else(|_| "neo4j".into());
    let password = std::env::var("GRAPH_PASSWORD_NEO4J").unwrap_or_else(|_| "password".into());

    match Neo4jClient::new(&uri, &user, &password).await {
        Ok(client) if client.health_check().await.unwrap_or(false) => Some(Arc::new(client)),
        _ => {
            eprintln!("Neo4j not available at {}", uri);
            None
        }
    }
}

async fn falkordb_store() -> Option<Arc<dyn GraphStore>> {
    let url = std::env::var("FALKORDB_URL").unwrap_or_else(|_| "redis://localhost:6379".into());

    match FalkorClient::new(&url, "dbt_graph_it", "", "").await {
        Ok(client) if client.health_check().await.unwrap_or(false) => Some(Arc::new(client)),
        _ => {
            eprintln!("FalkorDB not available at {}", url);
            None
        }
    }
}

fn loader(store: Arc<dyn GraphStore>) -> DbtGraphLoader {
    DbtGraphLoader::new(store, LoadOptions::default())
}

/// Full load from the fixture files, then the checks every backend must pass
async fn check_full_load(store: Arc<dyn GraphStore>) {
    let loader = loader(store.clone());

    let summary = loader
        .load_files(&fixture("manifest.json"), Some(&fixture("catalog.json")))
        .await
        .expect("load should succeed");

    assert_eq!(summary.nodes[&NodeLabel::Model], 2);
    assert_eq!(summary.nodes[&NodeLabel::Test], 1);
    assert_eq!(summary.total_nodes(), 8);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.node_count(NodeLabel::Model), 2);
    assert_eq!(stats.node_count(NodeLabel::Source), 1);
    assert_eq!(stats.node_count(NodeLabel::Seed), 1);
    assert_eq!(stats.node_count(NodeLabel::Snapshot), 1);
    assert_eq!(stats.node_count(NodeLabel::Test), 1);
    assert_eq!(stats.node_count(NodeLabel::Macro), 1);
    assert_eq!(stats.node_count(NodeLabel::Operation), 1);
    assert_eq!(stats.relationship_count(EdgeType::Tests), 1);
    assert_eq!(stats.relationship_count(EdgeType::UsesMacro), 1);
    assert!(stats.relationship_count(EdgeType::References) >= 3);

    // macro.dbt.test_not_null is not in the manifest
    let macros = summary.edges[&Wirer::MacroUsage];
    assert_eq!(macros.planned, 2);
    assert_eq!(macros.unresolved, 1);

    // A second load of the same artifacts gives the same graph
    loader
        .load_files(&fixture("manifest.json"), Some(&fixture("catalog.json")))
        .await
        .expect("reload should succeed");
    assert_eq!(store.stats().await.unwrap(), stats);
}

/// A malformed upload is rejected before the existing graph is touched
async fn check_parse_error_keeps_graph(store: Arc<dyn GraphStore>) {
    let loader = loader(store.clone());
    loader
        .load_files(&fixture("manifest.json"), None)
        .await
        .expect("load should succeed");
    let before = store.stats().await.unwrap();

    let err = loader.load(b"{\"nodes\": [", None).await.unwrap_err();
    assert!(matches!(err, LoadError::Parse { .. }));
    assert_eq!(store.stats().await.unwrap(), before);
}

// ============================================================================
// Neo4j
// ============================================================================

// Both checks share one graph, so they run in one test
#[tokio::test]
async fn test_neo4j_load() {
    let Some(store) = neo4j_store().await else {
        eprintln!("Skipping test: Neo4j not available");
        return;
    };
    check_full_load(store.clone()).await;
    check_parse_error_keeps_graph(store).await;
}

// ============================================================================
// FalkorDB
// ============================================================================

// Both checks share one graph, so they run in one test
#[tokio::test]
async fn test_falkordb_load() {
    let Some(store) = falkordb_store().await else {
        eprintln!("Skipping test: FalkorDB not available");
        return;
    };
    check_full_load(store.clone()).await;
    check_parse_error_keeps_graph(store).await;
}

#[test]
fn test_phases_are_ordered() {
    assert!(LoadPhase::SchemaReset < LoadPhase::NodesLoaded);
    assert!(LoadPhase::NodesLoaded < LoadPhase::EdgesWired);
}
