//! Parameter rendering and result-set decoding for `GRAPH.QUERY`.
//!
//! FalkorDB takes query parameters inline, as a `CYPHER k=v ...` prefix of the
//! query text, and answers with `[header, rows, statistics]` (or just
//! `[statistics]` for queries without a RETURN clause).

use crate::graph::models::PropertyValue;
use anyhow::{anyhow, bail, Result};
use redis::Value;
use std::collections::BTreeMap;

/// Render a property value as a Cypher literal
pub fn render_literal(value: &PropertyValue) -> Result<String> {
    Ok(match value {
        PropertyValue::String(s) => quote(s),
        PropertyValue::Integer(i) => i.to_string(),
        PropertyValue::Float(f) => {
            if !f.is_finite() {
                bail!("Non-finite float cannot be sent as a parameter: {}", f);
            }
            // `{:?}` keeps the decimal point for integral floats (1.0)
            format!("{:?}", f)
        }
        PropertyValue::Boolean(b) => b.to_string(),
        PropertyValue::StringList(items) => {
            let items: Vec<String> = items.iter().map(|s| quote(s)).collect();
            format!("[{}]", items.join(", "))
        }
    })
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Prefix `text` with its parameters: `CYPHER a=1 b="x" MATCH ...`
pub fn with_params(text: &str, params: &BTreeMap<String, PropertyValue>) -> Result<String> {
    if params.is_empty() {
        return Ok(text.to_string());
    }
    let mut rendered = Vec::with_capacity(params.len());
    for (key, value) in params {
        rendered.push(format!("{}={}", key, render_literal(value)?));
    }
    Ok(format!("CYPHER {} {}", rendered.join(" "), text))
}

/// A decoded `GRAPH.QUERY` result set
#[derive(Debug, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    fn column(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| anyhow!("Column '{}' missing from result", name))
    }

    /// Value of `name` in every row, as an integer
    pub fn ints(&self, name: &str) -> Result<Vec<i64>> {
        if self.rows.is_empty() {
            return Ok(Vec::new());
        }
        let idx = self.column(name)?;
        self.rows
            .iter()
            .map(|row| {
                row.get(idx)
                    .and_then(as_int)
                    .ok_or_else(|| anyhow!("'{}' is not an integer", name))
            })
            .collect()
    }

    /// Value of `name` in every row, as text (`None` for null cells)
    pub fn strings(&self, name: &str) -> Result<Vec<Option<String>>> {
        if self.rows.is_empty() {
            return Ok(Vec::new());
        }
        let idx = self.column(name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).and_then(as_string))
            .collect())
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::BulkString(bytes) => std::str::from_utf8(bytes).ok()?.parse().ok(),
        Value::SimpleString(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

/// Decode a non-compact `GRAPH.QUERY` reply
pub fn parse_result_set(reply: Value) -> Result<ResultSet> {
    let Value::Array(mut parts) = reply else {
        bail!("Unexpected GRAPH.QUERY reply: {:?}", reply);
    };

    // Statistics only: the query returned nothing
    if parts.len() < 3 {
        return Ok(ResultSet::default());
    }
    parts.truncate(2);
    let rows = parts.pop();
    let header = parts.pop();

    let columns = match header {
        Some(Value::Array(cols)) => cols
            .iter()
            .map(|col| match col {
                // Compact headers are [column_type, name] pairs
                Value::Array(pair) => pair.last().and_then(as_string),
                other => as_string(other),
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| anyhow!("Malformed result header"))?,
        _ => bail!("Malformed result header"),
    };

    let rows = match rows {
        Some(Value::Array(rows)) => rows
            .into_iter()
            .map(|row| match row {
                Value::Array(cells) => Ok(cells),
                other => Err(anyhow!("Malformed result row: {:?}", other)),
            })
            .collect::<Result<Vec<_>>>()?,
        _ => bail!("Malformed result rows"),
    };

    Ok(ResultSet { columns, rows })
}
