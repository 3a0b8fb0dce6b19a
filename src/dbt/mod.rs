//! dbt artifact parsing
//!
//! Typed views of `manifest.json` and `catalog.json`. Every resource kind the
//! loader materializes has its own record type with documented defaults.

pub mod catalog;
pub mod manifest;

pub use catalog::{Catalog, CatalogMetadata, CatalogNode};
pub use manifest::*;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Errors raised while decoding dbt artifacts. Nothing has been written to
/// the graph when one of these is returned.
#[derive(Error, Debug)]
pub enum DbtError {
    /// The document is not valid JSON or has the wrong top-level shape
    #[error("Failed to parse {document}: {source}")]
    Json {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// One record does not match the shape of its resource kind
    #[error("Malformed {kind} record '{unique_id}': {source}")]
    Record {
        kind: &'static str,
        unique_id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Deserialize a field that dbt may emit as `null`, falling back to the
/// type's default.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Text form of a version-like value. dbt emits model versions as either
/// numbers or strings; both are compared as text. Null and empty values
/// carry no version.
pub fn version_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Display name of a source table: `"{source_name}.{identifier}"`, or the
/// bare identifier when either part is empty.
///
/// Source nodes are stored under this name and source-dependency wiring looks
/// them up by it, so both sides must call this function.
pub fn source_display_name(source_name: &str, identifier: &str) -> String {
    if !source_name.is_empty() && !identifier.is_empty() {
        format!("{}.{}", source_name, identifier)
    } else {
        identifier.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_display_name() {
        assert_eq!(source_display_name("raw", "customers"), "raw.customers");
        assert_eq!(source_display_name("", "customers"), "customers");
        assert_eq!(source_display_name("raw", ""), "");
    }

    #[test]
    fn test_version_text() {
        assert_eq!(version_text(&json!(2)), Some("2".to_string()));
        assert_eq!(version_text(&json!("v3")), Some("v3".to_string()));
        assert_eq!(version_text(&json!("")), None);
        assert_eq!(version_text(&json!(null)), None);
    }
}
