//! Node materializers: one mapping per dbt resource kind from a typed record to
//! the flat property bag stored on its node.
//!
//! Nested documents are stored as compact JSON text with object keys sorted,
//! so the same record always produces byte-identical properties.

use crate::dbt::*;
use crate::graph::{GraphNode, GraphStore, NodeLabel, PropertyBag, PropertyValue};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::{Map, Value};

/// A record that can be written as one graph node
pub trait Materialize {
    const LABEL: NodeLabel;

    /// Property bag for this record (including `unique_id`)
    fn properties(&self, unique_id: &str) -> PropertyBag;

    fn to_node(&self, unique_id: &str) -> GraphNode {
        GraphNode {
            label: Self::LABEL,
            unique_id: unique_id.to_string(),
            properties: self.properties(unique_id),
        }
    }
}

/// Build one node per record
pub fn to_nodes<'a, R, I>(records: I) -> Vec<GraphNode>
where
    R: Materialize + 'a,
    I: IntoIterator<Item = (&'a str, R)>,
{
    records
        .into_iter()
        .map(|(unique_id, record)| record.to_node(unique_id))
        .collect()
}

/// Upsert every node, at most `concurrency` writes in flight.
/// Returns the number of nodes written.
pub async fn upsert_nodes(
    store: &dyn GraphStore,
    nodes: &[GraphNode],
    concurrency: usize,
) -> anyhow::Result<usize> {
    let writes: Vec<_> = nodes.iter().map(|node| store.upsert_node(node)).collect();

    stream::iter(writes)
        .buffer_unordered(concurrency.max(1))
        .try_collect::<Vec<()>>()
        .await?;

    Ok(nodes.len())
}

// ============================================================================
// Property helpers
// ============================================================================

struct Props(PropertyBag);

impl Props {
    fn new(unique_id: &str) -> Self {
        let mut bag = PropertyBag::new();
        bag.insert("unique_id".into(), unique_id.into());
        Self(bag)
    }

    fn set(&mut self, key: &str, value: impl Into<PropertyValue>) -> &mut Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    fn set_opt<V: Into<PropertyValue>>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    fn set_json(&mut self, key: &str, value: &Value) -> &mut Self {
        self.set(key, canonical(value).to_string())
    }

    /// Write the JSON text of `value` unless it is null or an empty
    /// string/list/object
    fn set_json_nonempty(&mut self, key: &str, value: Option<&Value>) -> &mut Self {
        if let Some(value) = value.filter(|v| !is_empty_value(v)) {
            self.set_json(key, value);
        }
        self
    }

    /// Fields every kind shares
    fn identity(
        &mut self,
        name: &str,
        resource_type: &str,
        default_type: &str,
        package_name: &str,
    ) -> &mut Self {
        let resource_type = if resource_type.is_empty() {
            default_type
        } else {
            resource_type
        };
        self.set("name", name)
            .set("resource_type", resource_type)
            .set("package_name", package_name)
    }

    fn file(&mut self, path: &str, original_file_path: &str) -> &mut Self {
        self.set("path", path)
            .set("original_file_path", original_file_path)
    }

    /// `enabled`, `tags` and `meta` from a node's config block
    fn config(&mut self, config: &NodeConfig) -> &mut Self {
        self.set("enabled", config.enabled.unwrap_or(true))
            .set("tags", config.tags.clone())
            .set_json("meta", &object(&config.meta))
    }

    fn relation(
        &mut self,
        database: &str,
        schema: &str,
        alias: &str,
        checksum: &FileChecksum,
        relation_name: &str,
    ) -> &mut Self {
        self.set("database", database)
            .set("schema", schema)
            .set("alias", alias)
            .set("checksum", checksum.checksum.as_str())
            .set("relation_name", relation_name)
    }

    fn code(&mut self, raw_code: &Option<String>, compiled_code: &Option<String>) -> &mut Self {
        self.set_opt("raw_code", raw_code.clone())
            .set_opt("compiled_code", compiled_code.clone())
    }

    fn build(self) -> PropertyBag {
        self.0
    }
}

fn object(map: &Map<String, Value>) -> Value {
    Value::Object(map.clone())
}

/// Rebuild `value` with object keys in sorted order at every level
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonical(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => canonical(other).to_string(),
    }
}

// ============================================================================
// Model
// ============================================================================

/// A model record together with its catalog entry, if the catalog has one
pub struct EnrichedModel<'a> {
    pub record: &'a ModelRecord,
    pub catalog: Option<&'a CatalogNode>,
}

impl Materialize for EnrichedModel<'_> {
    const LABEL: NodeLabel = NodeLabel::Model;

    fn properties(&self, unique_id: &str) -> PropertyBag {
        let r = self.record;
        let mut p = Props::new(unique_id);
        p.identity(&r.name, &r.resource_type, "model", &r.package_name)
            .file(&r.path, &r.original_file_path)
            .relation(&r.database, &r.schema, &r.alias, &r.checksum, &r.relation_name)
            .config(&r.config)
            .set(
                "materialized",
                r.config.materialized.clone().unwrap_or_default(),
            )
            .set("description", r.description.as_str())
            .set("language", r.language.as_deref().unwrap_or("sql"))
            .code(&r.raw_code, &r.compiled_code)
            .set(
                "access",
                r.config
                    .access
                    .clone()
                    .or_else(|| r.access.clone())
                    .unwrap_or_default(),
            )
            .set_opt("version", r.version.as_ref().and_then(version_text));

        if let Some(constraints) = r.constraints.as_ref().filter(|c| !c.is_null()) {
            p.set_json("constraints", constraints);
        }

        if let Some(entry) = self.catalog {
            let meta = &entry.metadata;
            p.set("table_type", meta.table_type.clone().unwrap_or_default())
                .set("table_comment", meta.comment.clone().unwrap_or_default())
                .set("owner", meta.owner.clone().unwrap_or_default());
        }

        p.build()
    }
}

// ============================================================================
// Source
// ============================================================================

impl Materialize for &SourceRecord {
    const LABEL: NodeLabel = NodeLabel::Source;

    fn properties(&self, unique_id: &str) -> PropertyBag {
        let mut p = Props::new(unique_id);
        p.identity(
            &self.display_name(),
            &self.resource_type,
            "source",
            &self.package_name,
        )
        .set("identifier", self.identifier())
        .set("source_name", self.source_name.as_str())
        .set("database", self.database.as_str())
        .set("schema", self.schema.as_str())
        .set("description", self.description.as_str())
        .set("loader", self.loader.as_str())
        .set("source_description", self.source_description.as_str())
        .set("relation_name", self.relation_name.as_str());

        if !self.freshness.is_empty() {
            let after = |key: &str| {
                self.freshness
                    .get(key)
                    .map(|v| canonical(v).to_string())
                    .unwrap_or_else(|| "{}".to_string())
            };
            p.set("freshness_warn_after", after("warn_after"))
                .set("freshness_error_after", after("error_after"));
            match self.freshness.get("filter") {
                None => {
                    p.set("freshness_filter", "");
                }
                Some(Value::Null) => {}
                Some(filter) => {
                    p.set("freshness_filter", text(filter));
                }
            }
        }

        if !self.columns.is_empty() {
            p.set("column_count", self.columns.len() as i64)
                .set_json("columns", &object(&self.columns));
        }

        if !self.quoting.is_empty() {
            p.set_json("quoting", &object(&self.quoting));
        }
        p.set_json_nonempty("external", self.external.as_ref());

        p.build()
    }
}

// ============================================================================
// Seed
// ============================================================================

impl Materialize for &SeedRecord {
    const LABEL: NodeLabel = NodeLabel::Seed;

    fn properties(&self, unique_id: &str) -> PropertyBag {
        let c = &self.config;
        let mut p = Props::new(unique_id);
        p.identity(&self.name, &self.resource_type, "seed", &self.package_name)
            .file(&self.path, &self.original_file_path)
            .relation(
                &self.database,
                &self.schema,
                &self.alias,
                &self.checksum,
                &self.relation_name,
            )
            .config(c)
            .set("root_path", self.root_path.as_str())
            .set(
                "materialized",
                c.materialized.as_deref().unwrap_or("seed"),
            )
            .set("delimiter", c.delimiter.as_deref().unwrap_or(","))
            .set_opt("quote_columns", c.quote_columns);

        if !c.column_types.is_empty() {
            p.set_json("column_types", &object(&c.column_types));
        }
        p.build()
    }
}

// ============================================================================
// Snapshot
// ============================================================================

impl Materialize for &SnapshotRecord {
    const LABEL: NodeLabel = NodeLabel::Snapshot;

    fn properties(&self, unique_id: &str) -> PropertyBag {
        let c = &self.config;
        let unique_key = match &c.unique_key {
            None | Some(Value::Null) => String::new(),
            Some(key) => text(key),
        };

        let mut p = Props::new(unique_id);
        p.identity(&self.name, &self.resource_type, "snapshot", &self.package_name)
            .file(&self.path, &self.original_file_path)
            .relation(
                &self.database,
                &self.schema,
                &self.alias,
                &self.checksum,
                &self.relation_name,
            )
            .config(c)
            .code(&self.raw_code, &self.compiled_code)
            .set(
                "materialized",
                c.materialized.as_deref().unwrap_or("snapshot"),
            )
            .set("strategy", c.strategy.clone().unwrap_or_default())
            .set("unique_key", unique_key)
            .set("updated_at", c.updated_at.clone().unwrap_or_default())
            .set("target_schema", c.target_schema.clone().unwrap_or_default())
            .set(
                "target_database",
                c.target_database.clone().unwrap_or_default(),
            )
            .set_json_nonempty("check_cols", c.check_cols.as_ref());

        if !c.snapshot_meta_column_names.is_empty() {
            p.set_json(
                "snapshot_meta_column_names",
                &object(&c.snapshot_meta_column_names),
            );
        }
        p.build()
    }
}

// ============================================================================
// Test
// ============================================================================

impl Materialize for &TestRecord {
    const LABEL: NodeLabel = NodeLabel::Test;

    fn properties(&self, unique_id: &str) -> PropertyBag {
        let c = &self.config;
        let mut p = Props::new(unique_id);
        p.identity(&self.name, &self.resource_type, "test", &self.package_name)
            .file(&self.path, &self.original_file_path)
            .config(c)
            .set_json("test_metadata", &object(&self.test_metadata))
            .set("column_name", self.column_name.as_str())
            .set("file_key_name", self.file_key_name.as_str())
            .set("language", self.language.as_deref().unwrap_or("sql"))
            .code(&self.raw_code, &self.compiled_code)
            .set("severity", c.severity.as_deref().unwrap_or("ERROR"))
            .set_opt("store_failures", c.store_failures)
            .set_opt("store_failures_as", c.store_failures_as.clone())
            .set_opt("where_clause", c.where_clause.clone())
            .set_opt("limit_clause", c.limit)
            .set("fail_calc", c.fail_calc.as_deref().unwrap_or("count(*)"))
            .set("warn_if", c.warn_if.as_deref().unwrap_or("!= 0"))
            .set("error_if", c.error_if.as_deref().unwrap_or("!= 0"));

        if !self.test_metadata.is_empty() {
            let meta = &self.test_metadata;
            p.set(
                "test_name",
                meta.get("name").map(text).unwrap_or_default(),
            )
            .set_json(
                "test_kwargs",
                meta.get("kwargs")
                    .filter(|v| !v.is_null())
                    .unwrap_or(&Value::Object(Map::new())),
            )
            .set_opt(
                "test_namespace",
                meta.get("namespace").filter(|v| !v.is_null()).map(text),
            );
        }
        p.build()
    }
}

// ============================================================================
// Macro
// ============================================================================

impl Materialize for &MacroRecord {
    const LABEL: NodeLabel = NodeLabel::Macro;

    fn properties(&self, unique_id: &str) -> PropertyBag {
        let mut p = Props::new(unique_id);
        p.identity(&self.name, &self.resource_type, "macro", &self.package_name)
            .file(&self.path, &self.original_file_path)
            .set("macro_sql", self.macro_sql.as_str())
            .set("description", self.description.as_str())
            .set_json("arguments", &Value::Array(self.arguments.clone()))
            .set_json(
                "supported_languages",
                &Value::from(self.supported_languages.clone()),
            )
            .set_opt("created_at", self.created_at);

        if let Some(docs) = &self.docs {
            p.set("docs_show", docs.show.unwrap_or(true))
                .set_opt("docs_node_color", docs.node_color.clone());
        }
        p.build()
    }
}

// ============================================================================
// Operation
// ============================================================================

impl Materialize for &OperationRecord {
    const LABEL: NodeLabel = NodeLabel::Operation;

    fn properties(&self, unique_id: &str) -> PropertyBag {
        let mut p = Props::new(unique_id);
        p.identity(&self.name, &self.resource_type, "operation", &self.package_name)
            .file(&self.path, &self.original_file_path)
            .config(&self.config)
            .set("database", self.database.as_str())
            .set("schema", self.schema.as_str())
            .set("raw_code", self.raw_code.as_str())
            .set("compiled_code", self.compiled_code.as_str())
            .set("index", self.index)
            .set("language", self.language.as_deref().unwrap_or("sql"))
            .set_opt("created_at", self.created_at);
        p.build()
    }
}
