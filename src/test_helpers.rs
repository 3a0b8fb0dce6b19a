//! Test helper factories and mock state builders
//!
//! Provides a small jaffle-shop style manifest/catalog pair covering every
//! resource kind, and helpers for building loaders and AppState over the
//! in-memory mock store.
#![allow(dead_code)]

use crate::graph::mock::MockGraphStore;
use crate::graph::GraphStore;
use crate::loader::{DbtGraphLoader, LoadOptions};
use crate::{AppState, Config, GraphBackend};
use serde_json::{json, Value};
use std::sync::Arc;

// ============================================================================
// Mock state builders
// ============================================================================

/// A loader writing into `store`; the store is returned for inspection.
pub fn mock_loader(store: MockGraphStore) -> (Arc<MockGraphStore>, DbtGraphLoader) {
    let store = Arc::new(store);
    let dyn_store: Arc<dyn GraphStore> = store.clone();
    let loader = DbtGraphLoader::new(
        dyn_store,
        LoadOptions {
            write_concurrency: 4,
        },
    );
    (store, loader)
}

pub fn test_config() -> Config {
    Config {
        server_port: 0,
        graph_backend: GraphBackend::Neo4j,
        neo4j_uri: "bolt://mock:7687".to_string(),
        neo4j_user: "neo4j".to_string(),
        neo4j_password: "mock".to_string(),
        falkordb_url: "redis://mock:6379".to_string(),
        falkordb_graph: "dbt_graph".to_string(),
        falkordb_user: String::new(),
        falkordb_password: String::new(),
        write_concurrency: 4,
    }
}

/// Create a mock AppState over an empty in-memory graph
pub fn mock_app_state() -> AppState {
    mock_app_state_with(Arc::new(MockGraphStore::new()))
}

/// Create a mock AppState over the given store
pub fn mock_app_state_with(store: Arc<MockGraphStore>) -> AppState {
    AppState::with_store(store, test_config())
}

// ============================================================================
// dbt artifacts
// ============================================================================

pub fn to_bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

/// One node of every kind plus the wiring between them:
///
/// - `stg_customers` reads source `raw.customers`
/// - `customers` refs `stg_customers` and uses macro `cents_to_dollars`
/// - a `not_null` test is attached to `customers`
pub fn jaffle_manifest() -> Value {
    json!({
        "metadata": {"dbt_version": "1.7.4", "project_name": "jaffle"},
        "nodes": {
            "model.jaffle.stg_customers": {
                "resource_type": "model",
                "name": "stg_customers",
                "package_name": "jaffle",
                "path": "staging/stg_customers.sql",
                "original_file_path": "models/staging/stg_customers.sql",
                "database": "analytics",
                "schema": "staging",
                "alias": "stg_customers",
                "checksum": {"name": "sha256", "checksum": "a1"},
                "config": {"enabled": true, "materialized": "view", "tags": ["staging"], "meta": {}},
                "raw_code": "select * from {{ source('raw', 'customers') }}",
                "refs": [],
                "sources": [["raw", "customers"]],
                "depends_on": {"macros": [], "nodes": ["source.jaffle.raw.customers"]}
            },
            "model.jaffle.customers": {
                "resource_type": "model",
                "name": "customers",
                "package_name": "jaffle",
                "path": "customers.sql",
                "original_file_path": "models/customers.sql",
                "database": "analytics",
                "schema": "marts",
                "alias": "customers",
                "description": "One row per customer",
                "checksum": {"name": "sha256", "checksum": "b2"},
                "config": {"enabled": true, "materialized": "table", "tags": [], "meta": {"owner": "growth"}},
                "refs": [{"name": "stg_customers", "package": null, "version": null}],
                "sources": [],
                "depends_on": {
                    "macros": ["macro.jaffle.cents_to_dollars"],
                    "nodes": ["model.jaffle.stg_customers"]
                }
            },
            "test.jaffle.not_null_customers_customer_id": {
                "resource_type": "test",
                "name": "not_null_customers_customer_id",
                "package_name": "jaffle",
                "path": "not_null_customers_customer_id.sql",
                "original_file_path": "models/schema.yml",
                "column_name": "customer_id",
                "attached_node": "model.jaffle.customers",
                "test_metadata": {
                    "name": "not_null",
                    "kwargs": {"column_name": "customer_id", "model": "{{ get_where_subquery(ref('customers')) }}"},
                    "namespace": null
                },
                "config": {"enabled": true, "severity": "ERROR", "tags": [], "meta": {}},
                "refs": [{"name": "customers", "package": null, "version": null}],
                "sources": [],
                "depends_on": {"macros": ["macro.dbt.test_not_null"], "nodes": ["model.jaffle.customers"]}
            },
            "seed.jaffle.raw_payments": {
                "resource_type": "seed",
                "name": "raw_payments",
                "package_name": "jaffle",
                "path": "raw_payments.csv",
                "original_file_path": "seeds/raw_payments.csv",
                "root_path": "/jaffle",
                "config": {"enabled": true, "delimiter": ",", "column_types": {"amount": "numeric"}},
                "depends_on": {"macros": [], "nodes": []}
            },
            "snapshot.jaffle.customers_snapshot": {
                "resource_type": "snapshot",
                "name": "customers_snapshot",
                "package_name": "jaffle",
                "path": "customers_snapshot.sql",
                "original_file_path": "snapshots/customers_snapshot.sql",
                "config": {
                    "strategy": "timestamp",
                    "unique_key": "customer_id",
                    "updated_at": "updated_at",
                    "target_schema": "snapshots"
                },
                "refs": [{"name": "stg_customers", "package": null, "version": null}],
                "depends_on": {"macros": [], "nodes": ["model.jaffle.stg_customers"]}
            },
            "operation.jaffle.jaffle-on-run-end-0": {
                "resource_type": "operation",
                "name": "jaffle-on-run-end-0",
                "package_name": "jaffle",
                "path": "hooks/jaffle-on-run-end-0.sql",
                "original_file_path": "./dbt_project.yml",
                "raw_code": "grant select on all tables in schema marts to reporter",
                "index": 0,
                "depends_on": {"macros": [], "nodes": []}
            },
            "analysis.jaffle.revenue": {
                "resource_type": "analysis",
                "name": "revenue",
                "package_name": "jaffle"
            }
        },
        "sources": {
            "source.jaffle.raw.customers": {
                "resource_type": "source",
                "name": "customers",
                "identifier": "customers",
                "source_name": "raw",
                "package_name": "jaffle",
                "database": "raw",
                "schema": "jaffle",
                "loader": "fivetran",
                "freshness": {"warn_after": {"count": 12, "period": "hour"}, "error_after": null, "filter": null},
                "columns": {"id": {"name": "id", "description": ""}}
            }
        },
        "macros": {
            "macro.jaffle.cents_to_dollars": {
                "resource_type": "macro",
                "name": "cents_to_dollars",
                "package_name": "jaffle",
                "path": "macros/cents_to_dollars.sql",
                "original_file_path": "macros/cents_to_dollars.sql",
                "macro_sql": "{% macro cents_to_dollars(col) %}({{ col }} / 100){% endmacro %}",
                "arguments": [],
                "supported_languages": ["sql"],
                "docs": {"show": true, "node_color": null}
            }
        },
        "parent_map": {
            "model.jaffle.stg_customers": ["source.jaffle.raw.customers"],
            "model.jaffle.customers": ["model.jaffle.stg_customers"],
            "test.jaffle.not_null_customers_customer_id": ["model.jaffle.customers"],
            "snapshot.jaffle.customers_snapshot": ["model.jaffle.stg_customers"]
        },
        "child_map": {
            "source.jaffle.raw.customers": ["model.jaffle.stg_customers"],
            "model.jaffle.stg_customers": ["model.jaffle.customers", "snapshot.jaffle.customers_snapshot"],
            "model.jaffle.customers": ["test.jaffle.not_null_customers_customer_id"]
        }
    })
}

/// Catalog with an entry for `customers` only
pub fn jaffle_catalog() -> Value {
    json!({
        "metadata": {"dbt_version": "1.7.4"},
        "nodes": {
            "model.jaffle.customers": {
                "metadata": {
                    "type": "BASE TABLE",
                    "schema": "marts",
                    "name": "customers",
                    "comment": "Customer dimension",
                    "owner": "analytics"
                },
                "columns": {}
            }
        },
        "sources": {}
    })
}
