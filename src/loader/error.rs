//! Load errors

use crate::dbt::DbtError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// States of one load, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Parsed,
    SchemaReset,
    NodesLoaded,
    EdgesWired,
    Done,
}

impl LoadPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadPhase::Parsed => "parsed",
            LoadPhase::SchemaReset => "schema_reset",
            LoadPhase::NodesLoaded => "nodes_loaded",
            LoadPhase::EdgesWired => "edges_wired",
            LoadPhase::Done => "done",
        }
    }
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    /// A document is not valid JSON; nothing was written
    #[error("Failed to parse {document}: {source}")]
    Parse {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A record does not match its resource kind; nothing was written
    #[error("Malformed {kind} record '{unique_id}': {source}")]
    Record {
        kind: &'static str,
        unique_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// A store write failed while working towards `phase`. Everything
    /// written before the failure stays in the graph.
    #[error("Graph store failure during {phase}: {source:#}")]
    Store {
        phase: LoadPhase,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    pub(crate) fn store(phase: LoadPhase) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| LoadError::Store { phase, source }
    }

    /// Whether the input documents were at fault (as opposed to the store or
    /// the filesystem)
    pub fn is_input_error(&self) -> bool {
        matches!(self, LoadError::Parse { .. } | LoadError::Record { .. })
    }
}

impl From<DbtError> for LoadError {
    fn from(err: DbtError) -> Self {
        match err {
            DbtError::Json { document, source } => LoadError::Parse { document, source },
            DbtError::Record {
                kind,
                unique_id,
                source,
            } => LoadError::Record {
                kind,
                unique_id,
                source,
            },
        }
    }
}
