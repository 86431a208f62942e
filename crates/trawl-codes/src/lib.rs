//! Trawl Codes - Filter code tables for search URL building.
//!
//! The job site filters by opaque numeric codes (`101010100` for Beijing,
//! `203` for a bachelor's degree). This crate loads the name-to-code tables
//! from JSON files and exposes them through the [`trawl_core::QueryEncoder`]
//! seam used when building search URLs.
//!
//! # Architecture
//!
//! - **Definition Types** ([`definition`]): Code tables and the table format parsers
//! - **Loader** ([`loader`]): JSON file loading from the `code-tables/` directory
//! - **Registry** ([`registry`]): Immutable lookup over all loaded tables
//! - **Errors** ([`error`]): Code-table error types
//!
//! # Example
//!
//! ```rust
//! use trawl_codes::{CodeRegistry, CodeTable};
//! use trawl_core::{FilterField, QueryEncoder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = CodeRegistry::from_tables([CodeTable::from_pairs(
//!     FilterField::City,
//!     [("北京", "101010100")],
//! )])?;
//!
//! assert_eq!(
//!     registry.encode(FilterField::City, "北京").as_deref(),
//!     Some("101010100")
//! );
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod definition;
pub mod error;
pub mod loader;
pub mod registry;

// Re-export commonly used types
pub use definition::{parse_conditions, CodeTable};
pub use error::{CodeError, Result};
pub use loader::CodeLoader;
pub use registry::CodeRegistry;
