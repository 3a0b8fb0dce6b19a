//! Stats reporter

use crate::graph::{GraphStats, GraphStore};
use tracing::info;

/// `(name, count)` pairs sorted by count descending, then name
pub fn sorted_counts(counts: &std::collections::BTreeMap<String, u64>) -> Vec<(&str, u64)> {
    let mut sorted: Vec<(&str, u64)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    sorted
}

/// Log node counts by label and relationship counts by type.
pub fn log_stats(stats: &GraphStats) {
    info!(
        "Graph has {} nodes and {} relationships",
        stats.total_nodes(),
        stats.total_relationships()
    );
    for (label, count) in sorted_counts(&stats.nodes) {
        info!("  {}: {}", label, count);
    }
    for (rel_type, count) in sorted_counts(&stats.relationships) {
        info!("  [{}]: {}", rel_type, count);
    }
}

/// Fetch statistics from the store and log them.
pub async fn report(store: &dyn GraphStore) -> anyhow::Result<GraphStats> {
    let stats = store.stats().await?;
    log_stats(&stats);
    Ok(stats)
}
