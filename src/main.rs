//! dbt Knowledge Graph - CLI and server
//!
//! Loads dbt `manifest.json` / `catalog.json` into Neo4j or FalkorDB.

use anyhow::Result;
use clap::{Parser, Subcommand};
use dbt_knowledge_graph::{loader::stats::sorted_counts, AppState, Config};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dbt-graph")]
#[command(about = "Load dbt project metadata into a graph database")]
struct Cli {
    /// YAML config file (defaults to ./config.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Rebuild the graph from files on disk
    Load {
        /// Path to manifest.json
        #[arg(short, long)]
        manifest: PathBuf,

        /// Path to catalog.json
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Print node and relationship counts
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dbt_knowledge_graph=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_yaml_and_env(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server_port = port;
            }
            dbt_knowledge_graph::start_server(config).await
        }
        Commands::Load { manifest, catalog } => run_load(config, manifest, catalog).await,
        Commands::Stats => run_stats(config).await,
    }
}

async fn run_load(config: Config, manifest: PathBuf, catalog: Option<PathBuf>) -> Result<()> {
    let state = AppState::new(config).await?;

    let summary = state
        .loader
        .load_files(&manifest, catalog.as_deref())
        .await?;

    tracing::info!(
        "Load {} complete in {} ms: {} records, {} nodes, {} relationships",
        summary.load_id,
        summary.duration_ms,
        summary.total_nodes(),
        summary.stats.total_nodes(),
        summary.stats.total_relationships()
    );
    for (wirer, count) in &summary.edges {
        tracing::info!(
            "  {}: {} planned, {} linked, {} unresolved",
            wirer,
            count.planned,
            count.linked,
            count.unresolved
        );
    }

    Ok(())
}

async fn run_stats(config: Config) -> Result<()> {
    let state = AppState::new(config).await?;
    let stats = state.store.stats().await?;

    println!("Nodes ({}):", stats.total_nodes());
    for (label, count) in sorted_counts(&stats.nodes) {
        println!("  {:<12} {}", label, count);
    }
    println!("Relationships ({}):", stats.total_relationships());
    for (edge_type, count) in sorted_counts(&stats.relationships) {
        println!("  {:<12} {}", edge_type, count);
    }

    Ok(())
}
