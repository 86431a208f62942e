//! Code table types and the parsers for the site's table formats.
//!
//! The site publishes its filter options in three shapes:
//!
//! - a conditions document, `{"zpData": {"degreeList": [{"name", "code"}], ...}}`
//! - a hierarchical tree, where each node may carry `subLevelModelList` children
//! - a flat `{"name": "code"}` map, as written by earlier exports

use crate::error::{CodeError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use trawl_core::FilterField;

/// Key under which child nodes are nested in hierarchical tables.
const CHILDREN_KEY: &str = "subLevelModelList";

/// Mapping of human-readable names to site codes for one filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    field: FilterField,
    entries: BTreeMap<String, String>,
}

impl CodeTable {
    /// Create an empty table for a filter.
    #[must_use]
    pub fn new(field: FilterField) -> Self {
        Self {
            field,
            entries: BTreeMap::new(),
        }
    }

    /// Create a table from `(name, code)` pairs.
    pub fn from_pairs<N, C>(field: FilterField, pairs: impl IntoIterator<Item = (N, C)>) -> Self
    where
        N: Into<String>,
        C: Into<String>,
    {
        Self {
            field,
            entries: pairs
                .into_iter()
                .map(|(name, code)| (name.into(), code.into()))
                .collect(),
        }
    }

    /// Parse a flat `{"name": code}` object.
    pub fn from_flat_map(field: FilterField, value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| CodeError::ValidationError {
            table: field.to_string(),
            reason: "expected a JSON object of name to code".to_string(),
        })?;

        let mut table = Self::new(field);
        for (name, code) in object {
            if let Some(code) = code_string(code) {
                table.entries.insert(name.clone(), code);
            }
        }
        Ok(table)
    }

    /// Parse a hierarchical node list, descending at most `depth` levels.
    ///
    /// A depth of 1 keeps only the top-level nodes; every extra level also
    /// collects the `subLevelModelList` children one step further down.
    pub fn from_hierarchy(field: FilterField, nodes: &Value, depth: usize) -> Result<Self> {
        let nodes = nodes.as_array().ok_or_else(|| CodeError::ValidationError {
            table: field.to_string(),
            reason: "expected a JSON array of nodes".to_string(),
        })?;

        let mut table = Self::new(field);
        collect_nodes(nodes, depth, &mut table.entries);
        Ok(table)
    }

    /// Filter this table translates.
    #[must_use]
    pub fn field(&self) -> FilterField {
        self.field
    }

    /// Look up the code for a name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, code)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, code)| (name.as_str(), code.as_str()))
    }

    /// Add the entries of another table for the same field.
    /// Existing names keep their code.
    pub fn merge(&mut self, other: CodeTable) {
        for (name, code) in other.entries {
            self.entries.entry(name).or_insert(code);
        }
    }

    /// Reject tables with blank names or codes.
    pub fn validate(&self) -> Result<()> {
        for (name, code) in &self.entries {
            if name.trim().is_empty() {
                return Err(CodeError::ValidationError {
                    table: self.field.to_string(),
                    reason: format!("blank name for code {code}"),
                });
            }
            if code.trim().is_empty() {
                return Err(CodeError::ValidationError {
                    table: self.field.to_string(),
                    reason: format!("blank code for {name}"),
                });
            }
        }
        Ok(())
    }
}

/// Parse a conditions document into one table per known filter.
///
/// Lists for filters this crate does not use (`payTypeList`, `partTimeList`)
/// are skipped.
pub fn parse_conditions(document: &Value) -> Result<Vec<CodeTable>> {
    let lists = document
        .get("zpData")
        .unwrap_or(document)
        .as_object()
        .ok_or_else(|| CodeError::ValidationError {
            table: "conditions".to_string(),
            reason: "expected an object of option lists".to_string(),
        })?;

    let mut tables = Vec::new();
    for (list_name, items) in lists {
        let Some(category) = list_name.strip_suffix("List") else {
            continue;
        };
        let Some(field) = FilterField::from_table_name(category) else {
            tracing::debug!(list = %list_name, "skipping unused condition list");
            continue;
        };
        tables.push(CodeTable::from_hierarchy(field, items, 1)?);
    }

    Ok(tables)
}

fn collect_nodes(nodes: &[Value], depth: usize, out: &mut BTreeMap<String, String>) {
    if depth == 0 {
        return;
    }

    for node in nodes {
        let Some(object) = node.as_object() else {
            continue;
        };

        if let (Some(name), Some(code)) = (
            object.get("name").and_then(Value::as_str),
            object.get("code").and_then(code_string),
        ) {
            out.insert(name.to_string(), code);
        }

        if let Some(children) = object.get(CHILDREN_KEY).and_then(Value::as_array) {
            collect_nodes(children, depth - 1, out);
        }
    }
}

/// Codes arrive as either JSON numbers or strings.
fn code_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
