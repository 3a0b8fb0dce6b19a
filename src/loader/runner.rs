//! Load orchestrator: parse → reset schema → create nodes → wire edges → stats.

use super::error::{LoadError, LoadPhase};
use super::materialize::{to_nodes, upsert_nodes, EnrichedModel};
use super::schema;
use super::stats;
use super::wiring::{wire_edges, WireCount, Wirer};
use crate::dbt::{Catalog, Manifest};
use crate::graph::{EdgeSpec, EdgeType, GraphNode, GraphStats, GraphStore, NodeLabel};
use futures::future::{try_join_all, BoxFuture, FutureExt};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Tuning knobs for a loader
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Maximum store writes in flight within one node kind or one wirer
    pub write_concurrency: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            write_concurrency: 8,
        }
    }
}

/// What one load did
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub load_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Records written per node label
    pub nodes: BTreeMap<NodeLabel, usize>,
    /// Planned/linked/unresolved edges per wirer
    pub edges: BTreeMap<Wirer, WireCount>,
    /// Graph statistics after the load
    pub stats: GraphStats,
}

impl LoadSummary {
    pub fn total_nodes(&self) -> usize {
        self.nodes.values().sum()
    }
}

/// Rebuilds the graph from dbt artifacts.
///
/// Every load wipes the graph first, so loads on one loader are serialized.
pub struct DbtGraphLoader {
    store: Arc<dyn GraphStore>,
    options: LoadOptions,
    write_lock: Mutex<()>,
}

impl DbtGraphLoader {
    pub fn new(store: Arc<dyn GraphStore>, options: LoadOptions) -> Self {
        Self {
            store,
            options,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Parse both payloads and rebuild the graph. An absent or blank catalog
    /// is not an error.
    pub async fn load(
        &self,
        manifest: &[u8],
        catalog: Option<&[u8]>,
    ) -> Result<LoadSummary, LoadError> {
        let manifest = Manifest::from_slice(manifest)?;
        let catalog = Catalog::from_optional(catalog)?;
        self.load_documents(&manifest, catalog.as_ref()).await
    }

    /// Read `manifest.json` (and optionally `catalog.json`) from disk, then load.
    pub async fn load_files(
        &self,
        manifest_path: &Path,
        catalog_path: Option<&Path>,
    ) -> Result<LoadSummary, LoadError> {
        let manifest = read_file(manifest_path).await?;
        let catalog = match catalog_path {
            Some(path) => Some(read_file(path).await?),
            None => None,
        };
        self.load(&manifest, catalog.as_deref()).await
    }

    /// Rebuild the graph from already parsed documents.
    pub async fn load_documents(
        &self,
        manifest: &Manifest,
        catalog: Option<&Catalog>,
    ) -> Result<LoadSummary, LoadError> {
        let _guard = self.write_lock.lock().await;

        let load_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = Instant::now();
        let store = self.store.as_ref();
        let concurrency = self.options.write_concurrency.max(1);

        info!(
            "Load {} started on {} ({} nodes, {} sources, {} macros, catalog: {})",
            load_id,
            store.backend_name(),
            manifest.nodes.len(),
            manifest.sources.len(),
            manifest.macros.len(),
            catalog.is_some()
        );

        // Schema
        schema::reset(store)
            .await
            .map_err(LoadError::store(LoadPhase::SchemaReset))?;

        // Nodes
        let batches = build_nodes(manifest, catalog);
        let mut nodes = BTreeMap::new();
        for (label, batch) in &batches {
            let count = upsert_nodes(store, batch, concurrency)
                .await
                .map_err(LoadError::store(LoadPhase::NodesLoaded))?;
            info!("Created {} {} nodes", count, label);
            nodes.insert(*label, count);
        }

        // Edges. Wirers that MERGE the same relationship type share a lane and
        // run one after another; lanes run concurrently.
        let plans: Vec<(Wirer, Vec<EdgeSpec>)> = Wirer::ALL
            .iter()
            .map(|wirer| (*wirer, wirer.plan(manifest)))
            .collect();
        let mut lanes: BTreeMap<EdgeType, Vec<&(Wirer, Vec<EdgeSpec>)>> = BTreeMap::new();
        for plan in &plans {
            lanes.entry(plan.0.edge_type()).or_default().push(plan);
        }
        let wiring: Vec<BoxFuture<'_, anyhow::Result<Vec<(Wirer, WireCount)>>>> = lanes
            .into_values()
            .map(|lane| wire_lane(store, lane, concurrency).boxed())
            .collect();
        let edges: BTreeMap<Wirer, WireCount> = try_join_all(wiring)
            .await
            .map_err(LoadError::store(LoadPhase::EdgesWired))?
            .into_iter()
            .flatten()
            .collect();

        // Stats
        let stats = stats::report(store)
            .await
            .map_err(LoadError::store(LoadPhase::Done))?;

        let duration_ms = timer.elapsed().as_millis() as u64;
        info!("Load {} finished in {} ms", load_id, duration_ms);

        Ok(LoadSummary {
            load_id,
            started_at,
            duration_ms,
            nodes,
            edges,
            stats,
        })
    }
}

/// Node batches in write order. Catalog enrichment goes to models only.
fn build_nodes(manifest: &Manifest, catalog: Option<&Catalog>) -> Vec<(NodeLabel, Vec<GraphNode>)> {
    let parts = manifest.partition();
    let models = parts.models.iter().map(|(id, record)| {
        let model = EnrichedModel {
            record: *record,
            catalog: catalog.and_then(|c| c.get(id)),
        };
        (*id, model)
    });

    vec![
        (NodeLabel::Model, to_nodes(models)),
        (
            NodeLabel::Source,
            to_nodes(manifest.sources.iter().map(|(id, r)| (id.as_str(), r))),
        ),
        (NodeLabel::Seed, to_nodes(parts.seeds.iter().copied())),
        (NodeLabel::Snapshot, to_nodes(parts.snapshots.iter().copied())),
        (NodeLabel::Test, to_nodes(parts.tests.iter().copied())),
        (
            NodeLabel::Macro,
            to_nodes(manifest.macros.iter().map(|(id, r)| (id.as_str(), r))),
        ),
        (NodeLabel::Operation, to_nodes(parts.operations.iter().copied())),
    ]
}

async fn wire_lane(
    store: &dyn GraphStore,
    lane: Vec<&(Wirer, Vec<EdgeSpec>)>,
    concurrency: usize,
) -> anyhow::Result<Vec<(Wirer, WireCount)>> {
    let mut counts = Vec::with_capacity(lane.len());
    for (wirer, edges) in lane {
        let count = wire_edges(store, *wirer, edges, concurrency).await?;
        info!(
            "Wired {}: {} planned, {} linked, {} unresolved",
            wirer, count.planned, count.linked, count.unresolved
        );
        counts.push((*wirer, count));
    }
    Ok(counts)
}

async fn read_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    tokio::fs::read(path).await.map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
