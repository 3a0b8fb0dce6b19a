//! dbt manifest.json parsing
//!
//! The manifest's unified `nodes` collection mixes several resource kinds.
//! Each record is decoded into the typed struct of its `resource_type`;
//! kinds the graph does not model are kept as [`ManifestNode::Other`].

use super::{nullable, version_text, DbtError};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ============================================================================
// Resource kinds
// ============================================================================

/// Resource kinds found in the manifest's `nodes` collection that are loaded
/// into the graph. Sources and macros have their own top-level collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeResourceType {
    Model,
    Test,
    Seed,
    Snapshot,
    Operation,
}

impl NodeResourceType {
    pub fn parse(resource_type: &str) -> Option<Self> {
        match resource_type {
            "model" => Some(Self::Model),
            "test" => Some(Self::Test),
            "seed" => Some(Self::Seed),
            "snapshot" => Some(Self::Snapshot),
            "operation" => Some(Self::Operation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Test => "test",
            Self::Seed => "seed",
            Self::Snapshot => "snapshot",
            Self::Operation => "operation",
        }
    }
}

// ============================================================================
// Shared sub-documents
// ============================================================================

/// The `config` block of a node. Keys only some kinds use are optional; the
/// per-kind defaults are applied when the node is materialized.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub enabled: Option<bool>,
    #[serde(deserialize_with = "nullable")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub meta: Map<String, Value>,
    pub materialized: Option<String>,
    pub access: Option<String>,

    // Tests
    pub severity: Option<String>,
    pub store_failures: Option<bool>,
    pub store_failures_as: Option<String>,
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
    pub limit: Option<i64>,
    pub fail_calc: Option<String>,
    pub warn_if: Option<String>,
    pub error_if: Option<String>,

    // Seeds
    pub delimiter: Option<String>,
    pub quote_columns: Option<bool>,
    #[serde(deserialize_with = "nullable")]
    pub column_types: Map<String, Value>,

    // Snapshots
    pub strategy: Option<String>,
    pub unique_key: Option<Value>,
    pub updated_at: Option<String>,
    pub target_schema: Option<String>,
    pub target_database: Option<String>,
    pub check_cols: Option<Value>,
    #[serde(deserialize_with = "nullable")]
    pub snapshot_meta_column_names: Map<String, Value>,
}

/// File checksum (`{"name": "sha256", "checksum": "..."}`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileChecksum {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub checksum: String,
}

/// `depends_on` block of a node
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DependsOn {
    #[serde(deserialize_with = "nullable")]
    pub macros: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub nodes: Vec<String>,
}

/// One entry of a node's `refs` list.
///
/// dbt >= 1.5 emits objects; older manifests emit `[name]` or
/// `[package, name]` lists, and hand-written fixtures often use bare names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RefEntry {
    Name(String),
    Legacy(Vec<String>),
    Structured {
        name: String,
        #[serde(default)]
        package: Option<String>,
        #[serde(default)]
        version: Option<Value>,
    },
}

/// A reference to a model, normalised from any [`RefEntry`] shape.
/// Qualifiers that are `None` do not constrain resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    pub name: String,
    pub package: Option<String>,
    pub version: Option<String>,
}

impl RefEntry {
    /// Normalise into a [`ModelRef`]. Entries without a usable name yield `None`.
    pub fn to_model_ref(&self) -> Option<ModelRef> {
        let (name, package, version) = match self {
            RefEntry::Name(name) => (name.clone(), None, None),
            RefEntry::Legacy(parts) => match parts.as_slice() {
                [name] => (name.clone(), None, None),
                [package, name] => (name.clone(), Some(package.clone()), None),
                _ => return None,
            },
            RefEntry::Structured {
                name,
                package,
                version,
            } => (
                name.clone(),
                package.clone(),
                version.as_ref().and_then(version_text),
            ),
        };

        if name.is_empty() {
            return None;
        }
        Some(ModelRef {
            name,
            package: package.filter(|p| !p.is_empty()),
            version,
        })
    }
}

/// Macro documentation settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MacroDocs {
    pub show: Option<bool>,
    pub node_color: Option<String>,
}

// ============================================================================
// Records per resource kind
// ============================================================================

/// A `model` node
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelRecord {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub resource_type: String,
    #[serde(deserialize_with = "nullable")]
    pub package_name: String,
    #[serde(deserialize_with = "nullable")]
    pub path: String,
    #[serde(deserialize_with = "nullable")]
    pub original_file_path: String,
    #[serde(deserialize_with = "nullable")]
    pub database: String,
    #[serde(deserialize_with = "nullable")]
    pub schema: String,
    #[serde(deserialize_with = "nullable")]
    pub alias: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub checksum: FileChecksum,
    #[serde(deserialize_with = "nullable")]
    pub relation_name: String,
    pub language: Option<String>,
    pub raw_code: Option<String>,
    pub compiled_code: Option<String>,
    /// Top-level access level (newer manifests); `config.access` wins when set
    pub access: Option<String>,
    pub version: Option<Value>,
    pub constraints: Option<Value>,
    #[serde(deserialize_with = "nullable")]
    pub config: NodeConfig,

    #[serde(deserialize_with = "nullable")]
    pub refs: Vec<RefEntry>,
    #[serde(deserialize_with = "nullable")]
    pub sources: Vec<Vec<String>>,
    #[serde(deserialize_with = "nullable")]
    pub depends_on: DependsOn,
}

/// A `test` node (generic or singular data test)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TestRecord {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub resource_type: String,
    #[serde(deserialize_with = "nullable")]
    pub package_name: String,
    #[serde(deserialize_with = "nullable")]
    pub path: String,
    #[serde(deserialize_with = "nullable")]
    pub original_file_path: String,
    #[serde(deserialize_with = "nullable")]
    pub test_metadata: Map<String, Value>,
    #[serde(deserialize_with = "nullable")]
    pub column_name: String,
    #[serde(deserialize_with = "nullable")]
    pub file_key_name: String,
    pub language: Option<String>,
    pub raw_code: Option<String>,
    pub compiled_code: Option<String>,
    /// The node this test is attached to
    pub attached_node: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub config: NodeConfig,

    #[serde(deserialize_with = "nullable")]
    pub refs: Vec<RefEntry>,
    #[serde(deserialize_with = "nullable")]
    pub sources: Vec<Vec<String>>,
    #[serde(deserialize_with = "nullable")]
    pub depends_on: DependsOn,
}

/// A `seed` node
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedRecord {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub resource_type: String,
    #[serde(deserialize_with = "nullable")]
    pub package_name: String,
    #[serde(deserialize_with = "nullable")]
    pub path: String,
    #[serde(deserialize_with = "nullable")]
    pub original_file_path: String,
    #[serde(deserialize_with = "nullable")]
    pub database: String,
    #[serde(deserialize_with = "nullable")]
    pub schema: String,
    #[serde(deserialize_with = "nullable")]
    pub alias: String,
    #[serde(deserialize_with = "nullable")]
    pub checksum: FileChecksum,
    #[serde(deserialize_with = "nullable")]
    pub relation_name: String,
    #[serde(deserialize_with = "nullable")]
    pub root_path: String,
    #[serde(deserialize_with = "nullable")]
    pub config: NodeConfig,

    #[serde(deserialize_with = "nullable")]
    pub refs: Vec<RefEntry>,
    #[serde(deserialize_with = "nullable")]
    pub sources: Vec<Vec<String>>,
    #[serde(deserialize_with = "nullable")]
    pub depends_on: DependsOn,
}

/// A `snapshot` node
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SnapshotRecord {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub resource_type: String,
    #[serde(deserialize_with = "nullable")]
    pub package_name: String,
    #[serde(deserialize_with = "nullable")]
    pub path: String,
    #[serde(deserialize_with = "nullable")]
    pub original_file_path: String,
    #[serde(deserialize_with = "nullable")]
    pub database: String,
    #[serde(deserialize_with = "nullable")]
    pub schema: String,
    #[serde(deserialize_with = "nullable")]
    pub alias: String,
    #[serde(deserialize_with = "nullable")]
    pub checksum: FileChecksum,
    #[serde(deserialize_with = "nullable")]
    pub relation_name: String,
    pub raw_code: Option<String>,
    pub compiled_code: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub config: NodeConfig,

    #[serde(deserialize_with = "nullable")]
    pub refs: Vec<RefEntry>,
    #[serde(deserialize_with = "nullable")]
    pub sources: Vec<Vec<String>>,
    #[serde(deserialize_with = "nullable")]
    pub depends_on: DependsOn,
}

/// An `operation` node (on-run-start / on-run-end hooks)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OperationRecord {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub resource_type: String,
    #[serde(deserialize_with = "nullable")]
    pub package_name: String,
    #[serde(deserialize_with = "nullable")]
    pub path: String,
    #[serde(deserialize_with = "nullable")]
    pub original_file_path: String,
    #[serde(deserialize_with = "nullable")]
    pub database: String,
    #[serde(deserialize_with = "nullable")]
    pub schema: String,
    #[serde(deserialize_with = "nullable")]
    pub raw_code: String,
    #[serde(deserialize_with = "nullable")]
    pub compiled_code: String,
    #[serde(deserialize_with = "nullable")]
    pub index: i64,
    pub language: Option<String>,
    pub created_at: Option<f64>,
    #[serde(deserialize_with = "nullable")]
    pub config: NodeConfig,

    #[serde(deserialize_with = "nullable")]
    pub refs: Vec<RefEntry>,
    #[serde(deserialize_with = "nullable")]
    pub sources: Vec<Vec<String>>,
    #[serde(deserialize_with = "nullable")]
    pub depends_on: DependsOn,
}

/// An entry of the manifest's `sources` collection
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceRecord {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    /// Physical table name; falls back to `name` when absent
    pub identifier: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub source_name: String,
    #[serde(deserialize_with = "nullable")]
    pub resource_type: String,
    #[serde(deserialize_with = "nullable")]
    pub package_name: String,
    #[serde(deserialize_with = "nullable")]
    pub path: String,
    #[serde(deserialize_with = "nullable")]
    pub original_file_path: String,
    #[serde(deserialize_with = "nullable")]
    pub database: String,
    #[serde(deserialize_with = "nullable")]
    pub schema: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub loader: String,
    #[serde(deserialize_with = "nullable")]
    pub source_description: String,
    #[serde(deserialize_with = "nullable")]
    pub relation_name: String,
    #[serde(deserialize_with = "nullable")]
    pub freshness: Map<String, Value>,
    #[serde(deserialize_with = "nullable")]
    pub columns: Map<String, Value>,
    #[serde(deserialize_with = "nullable")]
    pub quoting: Map<String, Value>,
    pub external: Option<Value>,
}

impl SourceRecord {
    /// Physical identifier, defaulting to the source table's `name`
    pub fn identifier(&self) -> &str {
        self.identifier.as_deref().unwrap_or(&self.name)
    }

    /// `"{source_name}.{identifier}"`, the name Source nodes are stored and
    /// looked up under
    pub fn display_name(&self) -> String {
        super::source_display_name(&self.source_name, self.identifier())
    }
}

/// An entry of the manifest's `macros` collection
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MacroRecord {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub resource_type: String,
    #[serde(deserialize_with = "nullable")]
    pub package_name: String,
    #[serde(deserialize_with = "nullable")]
    pub path: String,
    #[serde(deserialize_with = "nullable")]
    pub original_file_path: String,
    #[serde(deserialize_with = "nullable")]
    pub macro_sql: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub arguments: Vec<Value>,
    #[serde(deserialize_with = "nullable")]
    pub supported_languages: Vec<String>,
    pub created_at: Option<f64>,
    pub docs: Option<MacroDocs>,
}

// ============================================================================
// Manifest
// ============================================================================

/// One entry of the manifest's `nodes` collection
#[derive(Debug, Clone)]
pub enum ManifestNode {
    Model(ModelRecord),
    Test(TestRecord),
    Seed(SeedRecord),
    Snapshot(SnapshotRecord),
    Operation(OperationRecord),
    /// A kind the graph does not model (analysis, unit_test, ...)
    Other { resource_type: String },
}

impl ManifestNode {
    /// Decode a raw record according to its `resource_type`.
    pub fn from_value(unique_id: &str, value: Value) -> Result<Self, DbtError> {
        let resource_type = value
            .get("resource_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let Some(kind) = NodeResourceType::parse(&resource_type) else {
            return Ok(ManifestNode::Other { resource_type });
        };

        let record_err = |source| DbtError::Record {
            kind: kind.as_str(),
            unique_id: unique_id.to_string(),
            source,
        };

        Ok(match kind {
            NodeResourceType::Model => {
                ManifestNode::Model(serde_json::from_value(value).map_err(record_err)?)
            }
            NodeResourceType::Test => {
                ManifestNode::Test(serde_json::from_value(value).map_err(record_err)?)
            }
            NodeResourceType::Seed => {
                ManifestNode::Seed(serde_json::from_value(value).map_err(record_err)?)
            }
            NodeResourceType::Snapshot => {
                ManifestNode::Snapshot(serde_json::from_value(value).map_err(record_err)?)
            }
            NodeResourceType::Operation => {
                ManifestNode::Operation(serde_json::from_value(value).map_err(record_err)?)
            }
        })
    }

    pub fn resource_type(&self) -> Option<NodeResourceType> {
        match self {
            ManifestNode::Model(_) => Some(NodeResourceType::Model),
            ManifestNode::Test(_) => Some(NodeResourceType::Test),
            ManifestNode::Seed(_) => Some(NodeResourceType::Seed),
            ManifestNode::Snapshot(_) => Some(NodeResourceType::Snapshot),
            ManifestNode::Operation(_) => Some(NodeResourceType::Operation),
            ManifestNode::Other { .. } => None,
        }
    }

    /// `refs` entries of this node
    pub fn refs(&self) -> &[RefEntry] {
        match self {
            ManifestNode::Model(r) => &r.refs,
            ManifestNode::Test(r) => &r.refs,
            ManifestNode::Seed(r) => &r.refs,
            ManifestNode::Snapshot(r) => &r.refs,
            ManifestNode::Operation(r) => &r.refs,
            ManifestNode::Other { .. } => &[],
        }
    }

    /// `sources` entries of this node (`[source_name, table_name]` pairs)
    pub fn source_refs(&self) -> &[Vec<String>] {
        match self {
            ManifestNode::Model(r) => &r.sources,
            ManifestNode::Test(r) => &r.sources,
            ManifestNode::Seed(r) => &r.sources,
            ManifestNode::Snapshot(r) => &r.sources,
            ManifestNode::Operation(r) => &r.sources,
            ManifestNode::Other { .. } => &[],
        }
    }

    /// Macro unique ids from `depends_on.macros`
    pub fn macro_ids(&self) -> &[String] {
        match self {
            ManifestNode::Model(r) => &r.depends_on.macros,
            ManifestNode::Test(r) => &r.depends_on.macros,
            ManifestNode::Seed(r) => &r.depends_on.macros,
            ManifestNode::Snapshot(r) => &r.depends_on.macros,
            ManifestNode::Operation(r) => &r.depends_on.macros,
            ManifestNode::Other { .. } => &[],
        }
    }
}

/// Top-level shape of manifest.json, before records are typed
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawManifest {
    #[serde(deserialize_with = "nullable")]
    nodes: BTreeMap<String, Value>,
    #[serde(deserialize_with = "nullable")]
    sources: BTreeMap<String, Value>,
    #[serde(deserialize_with = "nullable")]
    macros: BTreeMap<String, Value>,
    #[serde(deserialize_with = "nullable")]
    parent_map: BTreeMap<String, Vec<String>>,
    #[serde(deserialize_with = "nullable")]
    child_map: BTreeMap<String, Vec<String>>,
}

/// Parsed dbt manifest. Collections are keyed by `unique_id` and ordered, so
/// iteration (and therefore every write the loader issues) is deterministic.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub nodes: BTreeMap<String, ManifestNode>,
    pub sources: BTreeMap<String, SourceRecord>,
    pub macros: BTreeMap<String, MacroRecord>,
    /// child unique_id -> parent unique_ids
    pub parent_map: BTreeMap<String, Vec<String>>,
    /// parent unique_id -> child unique_ids (kept, not used for wiring)
    pub child_map: BTreeMap<String, Vec<String>>,
}

/// Manifest nodes split by resource kind
#[derive(Debug, Default)]
pub struct PartitionedNodes<'a> {
    pub models: Vec<(&'a str, &'a ModelRecord)>,
    pub tests: Vec<(&'a str, &'a TestRecord)>,
    pub seeds: Vec<(&'a str, &'a SeedRecord)>,
    pub snapshots: Vec<(&'a str, &'a SnapshotRecord)>,
    pub operations: Vec<(&'a str, &'a OperationRecord)>,
}

impl Manifest {
    /// Parse manifest from JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DbtError> {
        let raw: RawManifest = serde_json::from_slice(bytes).map_err(|source| DbtError::Json {
            document: "manifest",
            source,
        })?;
        Self::from_raw(raw)
    }

    /// Parse manifest from a JSON string
    pub fn from_json(json: &str) -> Result<Self, DbtError> {
        Self::from_slice(json.as_bytes())
    }

    fn from_raw(raw: RawManifest) -> Result<Self, DbtError> {
        let nodes = raw
            .nodes
            .into_iter()
            .map(|(id, value)| {
                let node = ManifestNode::from_value(&id, value)?;
                Ok((id, node))
            })
            .collect::<Result<BTreeMap<_, _>, DbtError>>()?;

        let sources = raw
            .sources
            .into_iter()
            .map(|(id, value)| {
                let record = serde_json::from_value(value).map_err(|source| DbtError::Record {
                    kind: "source",
                    unique_id: id.clone(),
                    source,
                })?;
                Ok((id, record))
            })
            .collect::<Result<BTreeMap<_, _>, DbtError>>()?;

        let macros = raw
            .macros
            .into_iter()
            .map(|(id, value)| {
                let record = serde_json::from_value(value).map_err(|source| DbtError::Record {
                    kind: "macro",
                    unique_id: id.clone(),
                    source,
                })?;
                Ok((id, record))
            })
            .collect::<Result<BTreeMap<_, _>, DbtError>>()?;

        Ok(Self {
            nodes,
            sources,
            macros,
            parent_map: raw.parent_map,
            child_map: raw.child_map,
        })
    }

    /// Split `nodes` into the five disjoint kinds the graph models.
    /// Nodes of other kinds are left out.
    pub fn partition(&self) -> PartitionedNodes<'_> {
        let mut parts = PartitionedNodes::default();
        for (id, node) in &self.nodes {
            let id = id.as_str();
            match node {
                ManifestNode::Model(r) => parts.models.push((id, r)),
                ManifestNode::Test(r) => parts.tests.push((id, r)),
                ManifestNode::Seed(r) => parts.seeds.push((id, r)),
                ManifestNode::Snapshot(r) => parts.snapshots.push((id, r)),
                ManifestNode::Operation(r) => parts.operations.push((id, r)),
                ManifestNode::Other { .. } => {}
            }
        }
        parts
    }
}
