//! Search query encoding
//!
//! Payload's REST API reads nested query objects in bracket notation, e.g.
//! `where[title][like]=hello` or `select[author][name]=true`. This module
//! flattens JSON-shaped query options into those key/value pairs.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{PayloadMcpError, Result};

/// Options for a collection search.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    /// Filter, keyed by field then operator.
    #[serde(rename = "query", alias = "where")]
    pub where_clause: Option<Map<String, Value>>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
    pub sort: Option<String>,
    pub depth: Option<i64>,
    pub locale: Option<String>,
    pub fallback_locale: Option<String>,
    pub select: Option<Map<String, Value>>,
    pub populate: Option<Map<String, Value>>,
    pub joins: Option<Map<String, Value>>,
    pub trash: Option<bool>,
}

impl SearchQuery {
    /// Checks pagination and depth bounds.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a non-positive `limit` or `page`, or a
    /// negative `depth`.
    pub fn validate(&self) -> Result<()> {
        if matches!(self.limit, Some(l) if l <= 0) {
            return Err(
                PayloadMcpError::Validation("limit must be a positive integer".into()).into(),
            );
        }
        if matches!(self.page, Some(p) if p <= 0) {
            return Err(
                PayloadMcpError::Validation("page must be a positive integer".into()).into(),
            );
        }
        if matches!(self.depth, Some(d) if d < 0) {
            return Err(
                PayloadMcpError::Validation("depth must be a non-negative integer".into()).into(),
            );
        }
        Ok(())
    }

    /// Flattens the query into wire pairs. `locale` is left to the request.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if let Some(where_clause) = &self.where_clause {
            encode_where(where_clause, "where", &mut pairs);
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".into(), limit.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page".into(), page.to_string()));
        }
        if let Some(sort) = self.sort.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("sort".into(), sort.to_string()));
        }
        if let Some(depth) = self.depth {
            pairs.push(("depth".into(), depth.to_string()));
        }
        if let Some(fallback) = self.fallback_locale.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("fallback-locale".into(), fallback.to_string()));
        }
        if let Some(select) = &self.select {
            encode_nested(select, "select", &mut pairs);
        }
        if let Some(populate) = &self.populate {
            encode_nested(populate, "populate", &mut pairs);
        }
        if let Some(joins) = &self.joins {
            encode_nested(joins, "joins", &mut pairs);
        }
        if let Some(trash) = self.trash {
            pairs.push(("trash".into(), trash.to_string()));
        }

        pairs
    }
}

/// Encodes a `where` object.
///
/// Object values are `{operator: value}` maps; any other value is an
/// `equals` match. `and`/`or` arrays recurse with an index segment.
pub fn encode_where(clause: &Map<String, Value>, prefix: &str, out: &mut Vec<(String, String)>) {
    for (field, value) in clause {
        match (field.as_str(), value) {
            ("and" | "or", Value::Array(branches)) => {
                for (i, branch) in branches.iter().enumerate() {
                    if let Value::Object(inner) = branch {
                        encode_where(inner, &format!("{prefix}[{field}][{i}]"), out);
                    }
                }
            }
            (_, Value::Object(operators)) => {
                for (op, op_value) in operators {
                    out.push((format!("{prefix}[{field}][{op}]"), json_param(op_value)));
                }
            }
            _ => out.push((format!("{prefix}[{field}][equals]"), json_param(value))),
        }
    }
}

/// Encodes `select`, `populate` or `joins` one or two levels deep.
pub fn encode_nested(map: &Map<String, Value>, name: &str, out: &mut Vec<(String, String)>) {
    for (key, value) in map {
        match value {
            Value::Object(inner) => {
                for (nested_key, nested_value) in inner {
                    out.push((
                        format!("{name}[{key}][{nested_key}]"),
                        json_param(nested_value),
                    ));
                }
            }
            _ => out.push((format!("{name}[{key}]"), json_param(value))),
        }
    }
}

/// Scalars are sent as plain text (booleans lowercase); arrays and objects
/// are JSON-encoded.
fn json_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
