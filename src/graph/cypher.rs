//! Cypher statements shared by the Neo4j and FalkorDB backends.
//!
//! Each builder returns the query text plus its named parameters. The
//! backends only differ in how they ship parameters over the wire.

use super::models::*;
use std::collections::BTreeMap;

/// A parametrized Cypher statement
#[derive(Debug, Clone, PartialEq)]
pub struct CypherStatement {
    pub text: String,
    pub params: BTreeMap<String, PropertyValue>,
}

impl CypherStatement {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: BTreeMap::new(),
        }
    }

    fn param(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

pub const CLEAR_GRAPH: &str = "MATCH (n) DETACH DELETE n";

pub const NODE_COUNTS: &str = r#"
    MATCH (n)
    RETURN labels(n)[0] AS label, count(n) AS count
    ORDER BY count DESC
"#;

pub const RELATIONSHIP_COUNTS: &str = r#"
    MATCH ()-[r]->()
    RETURN type(r) AS rel_type, count(r) AS count
    ORDER BY count DESC
"#;

pub const HEALTH_CHECK: &str = "RETURN 1 AS ok";

/// Property keys are written into the query text, so only plain identifiers
/// are accepted.
pub fn is_valid_property_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `MERGE (n:Label {unique_id: $unique_id}) SET n = {...}`
///
/// The whole property bag is replaced, `unique_id` included.
pub fn upsert_node(node: &GraphNode) -> anyhow::Result<CypherStatement> {
    let mut assignments = vec!["unique_id: $unique_id".to_string()];
    let mut stmt = CypherStatement::new(String::new()).param("unique_id", node.unique_id.as_str());

    for (key, value) in &node.properties {
        if key == "unique_id" {
            continue;
        }
        if !is_valid_property_key(key) {
            anyhow::bail!("Invalid property key '{}' on {}", key, node.unique_id);
        }
        let param = format!("p_{}", key);
        assignments.push(format!("`{}`: ${}", key, param));
        stmt = stmt.param(param, value.clone());
    }

    stmt.text = format!(
        "MERGE (n:{label} {{unique_id: $unique_id}}) SET n = {{{props}}}",
        label = node.label.as_str(),
        props = assignments.join(", ")
    );
    Ok(stmt)
}

/// Render `MATCH (alias:Label) WHERE alias.k = $alias_k AND ...` and collect
/// the parameters.
fn match_clause(alias: &str, selector: &NodeSelector, stmt: &mut CypherStatement) -> String {
    let pattern = match selector.label {
        Some(label) => format!("MATCH ({}:{})", alias, label.as_str()),
        None => format!("MATCH ({})", alias),
    };
    let conditions: Vec<String> = selector
        .filters
        .iter()
        .map(|(key, value)| {
            let param = format!("{}_{}", alias, key.as_str());
            stmt.params
                .insert(param.clone(), PropertyValue::String(value.clone()));
            format!("{}.{} = ${}", alias, key.as_str(), param)
        })
        .collect();

    if conditions.is_empty() {
        pattern
    } else {
        format!("{} WHERE {}", pattern, conditions.join(" AND "))
    }
}

/// MERGE one relationship between every (from, to) pair and return how many
/// pairs were matched.
pub fn upsert_edge(edge: &EdgeSpec) -> CypherStatement {
    let mut stmt = CypherStatement::new(String::new());
    let from = match_clause("a", &edge.from, &mut stmt);
    let to = match_clause("b", &edge.to, &mut stmt);
    stmt.text = format!(
        "{}\n{}\nMERGE (a)-[:{}]->(b)\nRETURN count(*) AS linked",
        from,
        to,
        edge.edge_type.as_str()
    );
    stmt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_node_statement() {
        let mut properties = PropertyBag::new();
        properties.insert("unique_id".into(), "model.shop.orders".into());
        properties.insert("name".into(), "orders".into());
        properties.insert("enabled".into(), true.into());
        let node = GraphNode {
            label: NodeLabel::Model,
            unique_id: "model.shop.orders".into(),
            properties,
        };

        let stmt = upsert_node(&node).unwrap();
        assert_eq!(
            stmt.text,
            "MERGE (n:Model {unique_id: $unique_id}) SET n = {unique_id: $unique_id, `enabled`: $p_enabled, `name`: $p_name}"
        );
        assert_eq!(stmt.params.len(), 3);
        assert_eq!(stmt.params["p_enabled"], PropertyValue::Boolean(true));
    }

    #[test]
    fn test_upsert_node_rejects_bad_key() {
        let mut properties = PropertyBag::new();
        properties.insert("bad key}".into(), "x".into());
        let node = GraphNode {
            label: NodeLabel::Seed,
            unique_id: "seed.a.b".into(),
            properties,
        };
        assert!(upsert_node(&node).is_err());
    }

    #[test]
    fn test_upsert_edge_statement() {
        let edge = EdgeSpec::new(
            NodeSelector::by_id("model.shop.orders"),
            EdgeType::References,
            NodeSelector::named(NodeLabel::Model, "stg_orders").and(MatchKey::Version, "2"),
        );
        let stmt = upsert_edge(&edge);
        assert_eq!(
            stmt.text,
            "MATCH (a) WHERE a.unique_id = $a_unique_id\n\
             MATCH (b:Model) WHERE b.name = $b_name AND b.version = $b_version\n\
             MERGE (a)-[:REFERENCES]->(b)\n\
             RETURN count(*) AS linked"
        );
        assert_eq!(stmt.params["b_version"], PropertyValue::from("2"));
    }

    #[test]
    fn test_property_key_validation() {
        assert!(is_valid_property_key("table_type"));
        assert!(is_valid_property_key("_x1"));
        assert!(!is_valid_property_key("1abc"));
        assert!(!is_valid_property_key("a-b"));
        assert!(!is_valid_property_key(""));
    }
}
