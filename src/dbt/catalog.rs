//! dbt catalog.json parsing
//!
//! Only the per-node `metadata` block is read; column statistics are ignored.

use super::{nullable, DbtError};
use serde::Deserialize;
use std::collections::BTreeMap;

/// `metadata` of one catalog entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogMetadata {
    /// Physical object type (`BASE TABLE`, `VIEW`, ...)
    #[serde(rename = "type")]
    pub table_type: Option<String>,
    pub comment: Option<String>,
    pub owner: Option<String>,
}

/// One entry of the catalog's `nodes` collection
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogNode {
    #[serde(deserialize_with = "nullable")]
    pub metadata: CatalogMetadata,
}

/// Parsed dbt catalog, keyed by the same `unique_id`s as the manifest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Catalog {
    #[serde(deserialize_with = "nullable")]
    pub nodes: BTreeMap<String, CatalogNode>,
}

impl Catalog {
    /// Parse catalog from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DbtError> {
        serde_json::from_slice(bytes).map_err(|source| DbtError::Json {
            document: "catalog",
            source,
        })
    }

    /// Parse an optional catalog payload. A missing, empty or whitespace-only
    /// payload means "no catalog".
    pub fn from_optional(bytes: Option<&[u8]>) -> Result<Option<Self>, DbtError> {
        match bytes {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => {
                Self::from_slice(bytes).map(Some)
            }
            _ => Ok(None),
        }
    }

    pub fn get(&self, unique_id: &str) -> Option<&CatalogNode> {
        self.nodes.get(unique_id)
    }
}
