//! dbt Knowledge Graph
//!
//! Loads dbt project metadata into a labeled property graph:
//! - Typed parsing of `manifest.json` and `catalog.json`
//! - One node per resource (Model, Source, Seed, Snapshot, Test, Macro, Operation)
//! - DEPENDS_ON / REFERENCES / USES_MACRO / TESTS relationships
//! - Neo4j or FalkorDB behind one `GraphStore` interface
//! - HTTP upload endpoint and CLI

pub mod api;
pub mod dbt;
pub mod falkordb;
pub mod graph;
pub mod loader;
pub mod neo4j;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::Result;
use graph::GraphStore;
use loader::{DbtGraphLoader, LoadOptions};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: ServerYamlConfig,
    pub graph: GraphYamlConfig,
    pub neo4j: Neo4jYamlConfig,
    pub falkordb: FalkorDbYamlConfig,
    pub loader: LoaderYamlConfig,
}

/// Server configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerYamlConfig {
    pub port: u16,
}

impl Default for ServerYamlConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Which graph database the loader writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphBackend {
    #[default]
    Neo4j,
    #[serde(alias = "falkor")]
    FalkorDb,
}

impl FromStr for GraphBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "neo4j" => Ok(GraphBackend::Neo4j),
            "falkordb" | "falkor" => Ok(GraphBackend::FalkorDb),
            other => anyhow::bail!("Unknown graph backend '{}' (expected neo4j or falkordb)", other),
        }
    }
}

impl fmt::Display for GraphBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphBackend::Neo4j => f.write_str("neo4j"),
            GraphBackend::FalkorDb => f.write_str("falkordb"),
        }
    }
}

/// Graph selection section
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GraphYamlConfig {
    pub backend: GraphBackend,
}

/// Neo4j configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Neo4jYamlConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl Default for Neo4jYamlConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".into(),
            user: "neo4j".into(),
            password: "password".into(),
        }
    }
}

/// FalkorDB configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FalkorDbYamlConfig {
    pub url: String,
    pub graph: String,
    pub user: String,
    pub password: String,
}

impl Default for FalkorDbYamlConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".into(),
            graph: "dbt_graph".into(),
            user: String::new(),
            password: String::new(),
        }
    }
}

/// Loader tuning section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderYamlConfig {
    pub write_concurrency: usize,
}

impl Default for LoaderYamlConfig {
    fn default() -> Self {
        Self {
            write_concurrency: LoadOptions::default().write_concurrency,
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub graph_backend: GraphBackend,
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub falkordb_url: String,
    pub falkordb_graph: String,
    pub falkordb_user: String,
    pub falkordb_password: String,
    pub write_concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        // 1. Load YAML config (or defaults if file not found)
        let yaml = Self::load_yaml(yaml_path);

        // 2. Build Config with env var overrides
        let graph_backend = match std::env::var("GRAPH_DB") {
            Ok(value) => value.parse()?,
            Err(_) => yaml.graph.backend,
        };

        Ok(Self {
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.server.port),
            graph_backend,
            neo4j_uri: std::env::var("NEO4J_URI").unwrap_or(yaml.neo4j.uri),
            neo4j_user: std::env::var("GRAPH_USER_NEO4J").unwrap_or(yaml.neo4j.user),
            neo4j_password: std::env::var("GRAPH_PASSWORD_NEO4J").unwrap_or(yaml.neo4j.password),
            falkordb_url: std::env::var("FALKORDB_URL").unwrap_or(yaml.falkordb.url),
            falkordb_graph: std::env::var("FALKORDB_GRAPH").unwrap_or(yaml.falkordb.graph),
            falkordb_user: std::env::var("GRAPH_USER_FALKORDB").unwrap_or(yaml.falkordb.user),
            falkordb_password: std::env::var("GRAPH_PASSWORD_FALKORDB")
                .unwrap_or(yaml.falkordb.password),
            write_concurrency: std::env::var("LOADER_WRITE_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.loader.write_concurrency)
                .max(1),
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            write_concurrency: self.write_concurrency,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GraphStore>,
    pub loader: Arc<DbtGraphLoader>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Connect to the configured backend and build the loader on top of it
    pub async fn new(config: Config) -> Result<Self> {
        let store: Arc<dyn GraphStore> = match config.graph_backend {
            GraphBackend::Neo4j => Arc::new(
                neo4j::Neo4jClient::new(
                    &config.neo4j_uri,
                    &config.neo4j_user,
                    &config.neo4j_password,
                )
                .await?,
            ),
            GraphBackend::FalkorDb => Arc::new(
                falkordb::FalkorClient::new(
                    &config.falkordb_url,
                    &config.falkordb_graph,
                    &config.falkordb_user,
                    &config.falkordb_password,
                )
                .await?,
            ),
        };
        tracing::info!("Connected to {} backend", store.backend_name());

        Ok(Self::with_store(store, config))
    }

    /// Build state over an existing store
    pub fn with_store(store: Arc<dyn GraphStore>, config: Config) -> Self {
        let loader = Arc::new(DbtGraphLoader::new(store.clone(), config.load_options()));
        Self {
            store,
            loader,
            config: Arc::new(config),
        }
    }
}

/// Connect to the configured backend and serve the HTTP API until the
/// listener fails.
pub async fn start_server(config: Config) -> Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let state = AppState::new(config).await?;
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
