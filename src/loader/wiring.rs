//! Relationship wirers.
//!
//! Each wirer first plans the edges it wants from the manifest (pure, no I/O),
//! then MERGEs them against nodes that already exist. An endpoint that cannot
//! be resolved links nothing; that is counted, never raised.

use crate::dbt::{source_display_name, Manifest, ManifestNode, ModelRef};
use crate::graph::{EdgeSpec, EdgeType, GraphStore, MatchKey, NodeLabel, NodeSelector};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// The five relationship producers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Wirer {
    /// `parent_map`: child DEPENDS_ON parent
    StructuralDependency,
    /// `refs`: node REFERENCES model
    Reference,
    /// `sources`: node DEPENDS_ON source
    SourceDependency,
    /// `depends_on.macros`: node USES_MACRO macro
    MacroUsage,
    /// `attached_node`: test TESTS node
    TestCoverage,
}

impl Wirer {
    pub const ALL: [Wirer; 5] = [
        Wirer::StructuralDependency,
        Wirer::Reference,
        Wirer::SourceDependency,
        Wirer::MacroUsage,
        Wirer::TestCoverage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Wirer::StructuralDependency => "structural_dependency",
            Wirer::Reference => "reference",
            Wirer::SourceDependency => "source_dependency",
            Wirer::MacroUsage => "macro_usage",
            Wirer::TestCoverage => "test_coverage",
        }
    }

    pub fn edge_type(&self) -> EdgeType {
        match self {
            Wirer::StructuralDependency | Wirer::SourceDependency => EdgeType::DependsOn,
            Wirer::Reference => EdgeType::References,
            Wirer::MacroUsage => EdgeType::UsesMacro,
            Wirer::TestCoverage => EdgeType::Tests,
        }
    }

    /// Edges this wirer will MERGE, deduplicated and in a stable order
    pub fn plan(&self, manifest: &Manifest) -> Vec<EdgeSpec> {
        match self {
            Wirer::StructuralDependency => dependency_edges(manifest),
            Wirer::Reference => reference_edges(manifest),
            Wirer::SourceDependency => source_edges(manifest),
            Wirer::MacroUsage => macro_edges(manifest),
            Wirer::TestCoverage => test_edges(manifest),
        }
    }
}

impl fmt::Display for Wirer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Planning
// ============================================================================

/// Child DEPENDS_ON each of its parents, both resolved by unique_id across
/// every label
pub fn dependency_edges(manifest: &Manifest) -> Vec<EdgeSpec> {
    let mut edges = BTreeSet::new();
    for (child, parents) in &manifest.parent_map {
        for parent in parents {
            edges.insert(EdgeSpec::new(
                NodeSelector::by_id(child.as_str()),
                EdgeType::DependsOn,
                NodeSelector::by_id(parent.as_str()),
            ));
        }
    }
    edges.into_iter().collect()
}

/// Selector for the model(s) a reference resolves to. Qualifiers that are
/// absent do not constrain the match.
pub fn model_selector(model_ref: &ModelRef) -> NodeSelector {
    let mut selector = NodeSelector::named(NodeLabel::Model, model_ref.name.as_str());
    if let Some(package) = &model_ref.package {
        selector = selector.and(MatchKey::PackageName, package.as_str());
    }
    if let Some(version) = &model_ref.version {
        selector = selector.and(MatchKey::Version, version.as_str());
    }
    selector
}

pub fn reference_edges(manifest: &Manifest) -> Vec<EdgeSpec> {
    let mut edges = BTreeSet::new();
    for (unique_id, node) in &manifest.nodes {
        for model_ref in node.refs().iter().filter_map(|r| r.to_model_ref()) {
            edges.insert(EdgeSpec::new(
                NodeSelector::by_id(unique_id.as_str()),
                EdgeType::References,
                model_selector(&model_ref),
            ));
        }
    }
    edges.into_iter().collect()
}

/// Node DEPENDS_ON the Source whose display name is `"{source_name}.{table}"`
pub fn source_edges(manifest: &Manifest) -> Vec<EdgeSpec> {
    let mut edges = BTreeSet::new();
    for (unique_id, node) in &manifest.nodes {
        for pair in node.source_refs() {
            let [source_name, table_name, ..] = pair.as_slice() else {
                debug!("Skipping malformed source reference on {}: {:?}", unique_id, pair);
                continue;
            };
            edges.insert(EdgeSpec::new(
                NodeSelector::by_id(unique_id.as_str()),
                EdgeType::DependsOn,
                NodeSelector::named(
                    NodeLabel::Source,
                    source_display_name(source_name, table_name),
                ),
            ));
        }
    }
    edges.into_iter().collect()
}

pub fn macro_edges(manifest: &Manifest) -> Vec<EdgeSpec> {
    let mut edges = BTreeSet::new();
    for (unique_id, node) in &manifest.nodes {
        for macro_id in node.macro_ids() {
            edges.insert(EdgeSpec::new(
                NodeSelector::by_id(unique_id.as_str()),
                EdgeType::UsesMacro,
                NodeSelector::labeled(NodeLabel::Macro, macro_id.as_str()),
            ));
        }
    }
    edges.into_iter().collect()
}

pub fn test_edges(manifest: &Manifest) -> Vec<EdgeSpec> {
    let mut edges = BTreeSet::new();
    for (unique_id, node) in &manifest.nodes {
        let ManifestNode::Test(test) = node else {
            continue;
        };
        if let Some(attached) = test.attached_node.as_deref().filter(|id| !id.is_empty()) {
            edges.insert(EdgeSpec::new(
                NodeSelector::labeled(NodeLabel::Test, unique_id.as_str()),
                EdgeType::Tests,
                NodeSelector::by_id(attached),
            ));
        }
    }
    edges.into_iter().collect()
}

// ============================================================================
// Execution
// ============================================================================

/// Outcome of one wirer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WireCount {
    /// Distinct edges planned
    pub planned: usize,
    /// Relationships matched or created
    pub linked: u64,
    /// Planned edges with an endpoint that resolved to no node
    pub unresolved: usize,
}

/// MERGE every planned edge, at most `concurrency` writes in flight.
pub async fn wire_edges(
    store: &dyn GraphStore,
    wirer: Wirer,
    edges: &[EdgeSpec],
    concurrency: usize,
) -> anyhow::Result<WireCount> {
    let writes: Vec<_> = edges.iter().map(|edge| store.upsert_edge(edge)).collect();
    let linked: Vec<u64> = stream::iter(writes)
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut count = WireCount {
        planned: edges.len(),
        ..WireCount::default()
    };
    for (edge, linked) in edges.iter().zip(linked) {
        match linked {
            0 => {
                count.unresolved += 1;
                debug!(
                    "{}: unresolved {} edge {} -> {}",
                    wirer, edge.edge_type, edge.from, edge.to
                );
            }
            1 => {}
            n => debug!("{}: {} -> {} matched {} targets", wirer, edge.from, edge.to, n),
        }
        count.linked += linked;
    }
    Ok(count)
}
