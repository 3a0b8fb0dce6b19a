//! Schema initializer: wipe the graph and (re)install constraints and
//! lookup indexes.

use crate::graph::{GraphStore, NodeLabel};
use tracing::{info, warn};

/// Non-unique lookup indexes on the join keys of reference and
/// source-dependency wiring
pub const LOOKUP_INDEXES: [(NodeLabel, &str); 2] =
    [(NodeLabel::Model, "name"), (NodeLabel::Source, "name")];

/// Delete everything, then install one `unique_id` constraint per label and
/// the lookup indexes.
///
/// Only the delete can fail the reset. Constraint and index creation errors
/// (typically "already exists" on a re-load) are logged and skipped.
pub async fn reset(store: &dyn GraphStore) -> anyhow::Result<()> {
    store.clear_graph().await?;
    info!("Cleared graph");

    for label in NodeLabel::ALL {
        if let Err(e) = store.create_unique_constraint(label).await {
            warn!("Constraint may already exist: {:#}", e);
        }
    }

    for (label, property) in LOOKUP_INDEXES {
        if let Err(e) = store.create_property_index(label, property).await {
            warn!("Index may already exist: {:#}", e);
        }
    }

    Ok(())
}
