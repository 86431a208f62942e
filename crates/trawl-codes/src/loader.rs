//! Code table loading from JSON files.
//!
//! This module reads the site's option tables from a `code-tables/` directory.
//! Recognized files:
//!
//! - `conditions.json`: experience, degree, salary, scale, stage and job type
//! - `city_code_map.json` (flat) or `city.json` (vendor tree, two levels)
//! - `business_code_map.json` (flat) or `business_district.json` (vendor tree)

use crate::{
    definition::{parse_conditions, CodeTable},
    error::{CodeError, Result},
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use trawl_core::FilterField;

/// Conditions document file name.
pub const CONDITIONS_FILE: &str = "conditions.json";
/// Flat city map file name.
pub const CITY_MAP_FILE: &str = "city_code_map.json";
/// Vendor city tree file name.
pub const CITY_TREE_FILE: &str = "city.json";
/// Flat business district map file name.
pub const DISTRICT_MAP_FILE: &str = "business_code_map.json";
/// Vendor business district tree file name.
pub const DISTRICT_TREE_FILE: &str = "business_district.json";

/// Levels of the city tree that hold selectable cities.
const CITY_TREE_DEPTH: usize = 2;
/// Levels of the business district tree that hold selectable districts.
const DISTRICT_TREE_DEPTH: usize = 5;

/// Loader for code tables from JSON files.
#[derive(Debug)]
pub struct CodeLoader {
    /// Directory containing the table files
    tables_dir: PathBuf,
}

impl CodeLoader {
    /// Create a new loader with the given tables directory.
    ///
    /// # Errors
    /// Returns error if the directory doesn't exist.
    pub fn new(tables_dir: impl Into<PathBuf>) -> Result<Self> {
        let tables_dir = tables_dir.into();

        if !tables_dir.is_dir() {
            return Err(CodeError::DirectoryNotFound {
                path: tables_dir.display().to_string(),
            });
        }

        Ok(Self { tables_dir })
    }

    /// Create a loader using the default tables directory.
    ///
    /// Looks for `code-tables/` relative to the workspace root.
    ///
    /// # Errors
    /// Returns error if the default directory doesn't exist.
    pub fn with_default_dir() -> Result<Self> {
        let mut current_dir = std::env::current_dir()?;

        loop {
            let cargo_toml = current_dir.join("Cargo.toml");
            if let Ok(contents) = std::fs::read_to_string(&cargo_toml) {
                if contents.contains("[workspace]") {
                    return Self::new(current_dir.join("code-tables"));
                }
            }

            if let Some(parent) = current_dir.parent() {
                current_dir = parent.to_path_buf();
            } else {
                break;
            }
        }

        Self::new(PathBuf::from("code-tables"))
    }

    /// Directory this loader reads from.
    #[must_use]
    pub fn tables_dir(&self) -> &Path {
        &self.tables_dir
    }

    /// Load every recognized table in the directory.
    ///
    /// Missing files are skipped; unreadable or malformed files are logged as
    /// warnings and skipped.
    ///
    /// # Errors
    /// Returns error only if the directory itself cannot be accessed.
    pub fn load_all(&self) -> Result<Vec<CodeTable>> {
        if !self.tables_dir.is_dir() {
            return Err(CodeError::DirectoryNotFound {
                path: self.tables_dir.display().to_string(),
            });
        }

        let mut tables = Vec::new();

        if let Some(conditions) = self.try_load(CONDITIONS_FILE, |doc| parse_conditions(doc)) {
            tables.extend(conditions);
        }

        let city = self
            .try_load(CITY_MAP_FILE, |doc| {
                CodeTable::from_flat_map(FilterField::City, doc)
            })
            .or_else(|| {
                self.try_load(CITY_TREE_FILE, |doc| {
                    let nodes = doc
                        .pointer("/zpData/cityList")
                        .unwrap_or(&Value::Null);
                    CodeTable::from_hierarchy(FilterField::City, nodes, CITY_TREE_DEPTH)
                })
            });
        tables.extend(city);

        let district = self
            .try_load(DISTRICT_MAP_FILE, |doc| {
                CodeTable::from_flat_map(FilterField::District, doc)
            })
            .or_else(|| {
                self.try_load(DISTRICT_TREE_FILE, |doc| {
                    let root = doc
                        .pointer("/zpData/businessDistrict")
                        .cloned()
                        .unwrap_or(Value::Null);
                    CodeTable::from_hierarchy(
                        FilterField::District,
                        &Value::Array(vec![root]),
                        DISTRICT_TREE_DEPTH,
                    )
                })
            });
        tables.extend(district);

        info!(
            count = tables.len(),
            dir = %self.tables_dir.display(),
            "loaded code tables"
        );

        Ok(tables)
    }

    /// Parse one file, logging and swallowing any failure.
    fn try_load<T>(&self, file_name: &str, parse: impl FnOnce(&Value) -> Result<T>) -> Option<T> {
        let path = self.tables_dir.join(file_name);
        if !path.exists() {
            debug!(path = %path.display(), "code table file absent");
            return None;
        }

        match Self::load_from_path(&path).and_then(|doc| parse(&doc)) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to load code table"
                );
                None
            }
        }
    }

    /// Load and parse a JSON document from a path.
    pub fn load_from_path(path: &Path) -> Result<Value> {
        let contents = std::fs::read_to_string(path).map_err(|e| CodeError::LoadError {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        serde_json::from_str(&contents).map_err(|e| CodeError::ParseError {
            path: path.display().to_string(),
            source: e,
        })
    }
}
