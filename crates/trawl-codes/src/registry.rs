//! In-memory code table registry with lookup support.

use crate::{definition::CodeTable, error::Result, loader::CodeLoader};
use std::collections::HashMap;
use tracing::{debug, info};
use trawl_core::{FilterField, QueryEncoder};

/// Read-only collection of code tables, one per filter.
///
/// Built once at startup and shared by reference; lookups never mutate it.
#[derive(Debug, Clone, Default)]
pub struct CodeRegistry {
    tables: HashMap<FilterField, CodeTable>,
}

impl CodeRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from every table the loader finds.
    ///
    /// # Errors
    /// Returns error if the tables directory is unreadable or a table fails
    /// validation.
    pub fn load_from(loader: &CodeLoader) -> Result<Self> {
        Self::from_tables(loader.load_all()?)
    }

    /// Create a registry from already parsed tables.
    ///
    /// Tables for the same field are merged; the first code seen for a name
    /// wins.
    ///
    /// # Errors
    /// Returns error if any table contains blank names or codes.
    pub fn from_tables(tables: impl IntoIterator<Item = CodeTable>) -> Result<Self> {
        let mut merged: HashMap<FilterField, CodeTable> = HashMap::new();

        for table in tables {
            table.validate()?;
            match merged.get_mut(&table.field()) {
                Some(existing) => existing.merge(table),
                None => {
                    merged.insert(table.field(), table);
                }
            }
        }

        info!(
            tables = merged.len(),
            entries = merged.values().map(CodeTable::len).sum::<usize>(),
            "built code registry"
        );

        Ok(Self { tables: merged })
    }

    /// Look up the code for a value.
    #[must_use]
    pub fn get(&self, field: FilterField, name: &str) -> Option<&str> {
        self.tables.get(&field)?.get(name.trim())
    }

    /// Table for a field, if one was loaded.
    #[must_use]
    pub fn table(&self, field: FilterField) -> Option<&CodeTable> {
        self.tables.get(&field)
    }

    /// Whether a table was loaded for the field.
    #[must_use]
    pub fn contains(&self, field: FilterField) -> bool {
        self.tables.contains_key(&field)
    }

    /// Number of loaded tables.
    #[must_use]
    pub fn count(&self) -> usize {
        self.tables.len()
    }

    /// Fields with a loaded table, in URL parameter order.
    #[must_use]
    pub fn fields(&self) -> Vec<FilterField> {
        FilterField::ALL
            .into_iter()
            .filter(|field| self.contains(*field))
            .collect()
    }
}

impl QueryEncoder for CodeRegistry {
    fn encode(&self, field: FilterField, value: &str) -> Option<String> {
        let code = self.get(field, value);
        if code.is_none() {
            debug!(%field, value, "no code for filter value");
        }
        code.map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodeError;

    fn sample() -> CodeRegistry {
        CodeRegistry::from_tables([
            CodeTable::from_pairs(
                FilterField::City,
                [("北京", "101010100"), ("上海", "101020100")],
            ),
            CodeTable::from_pairs(FilterField::Degree, [("本科", "203")]),
        ])
        .expect("build registry")
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = CodeRegistry::new();
        assert_eq!(registry.count(), 0);
        assert!(registry.fields().is_empty());
    }

    #[test]
    fn test_get_trims_value() {
        let registry = sample();
        assert_eq!(registry.get(FilterField::City, " 上海 "), Some("101020100"));
        assert_eq!(registry.get(FilterField::City, "火星"), None);
        assert_eq!(registry.get(FilterField::Salary, "10-20K"), None);
    }

    #[test]
    fn test_fields_follow_url_order() {
        let registry = sample();
        assert_eq!(
            registry.fields(),
            vec![FilterField::City, FilterField::Degree]
        );
        assert!(registry.contains(FilterField::Degree));
        assert!(!registry.contains(FilterField::Stage));
    }

    #[test]
    fn test_from_tables_merges_same_field() {
        let registry = CodeRegistry::from_tables([
            CodeTable::from_pairs(FilterField::City, [("北京", "1")]),
            CodeTable::from_pairs(FilterField::City, [("北京", "9"), ("广州", "2")]),
        ])
        .expect("build registry");

        assert_eq!(registry.count(), 1);
        let city = registry.table(FilterField::City).expect("city table");
        assert_eq!(city.len(), 2);
        assert_eq!(city.get("北京"), Some("1"));
    }

    #[test]
    fn test_from_tables_rejects_invalid_table() {
        let result =
            CodeRegistry::from_tables([CodeTable::from_pairs(FilterField::City, [("", "1")])]);
        assert!(matches!(result, Err(CodeError::ValidationError { .. })));
    }

    #[test]
    fn test_encoder_impl() {
        let registry = sample();
        let encoder: &dyn QueryEncoder = &registry;
        assert_eq!(
            encoder.encode(FilterField::Degree, "本科"),
            Some("203".to_string())
        );
        assert_eq!(encoder.encode(FilterField::Degree, "博士"), None);
    }
}
