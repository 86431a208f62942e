//! Trawl Core - Foundation crate for the Trawl job collector.
//!
//! This crate provides shared types, error handling, configuration management,
//! and the query-encoding seam that all other Trawl crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Search request model and captured-response types
//! - [`encoder`] - Filter value to site code translation trait
//!
//! # Example
//!
//! ```rust
//! use trawl_core::{AppConfig, FilterField, SearchQuery};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let query = SearchQuery::keywords("Rust")
//!     .with_city("上海")
//!     .with_filter(FilterField::Degree, "本科")
//!     .with_page_size(config.limits.page_size);
//! query.validate()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod encoder;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, DelayRange, LimitConfig, OutputConfig, PacingConfig, PayloadLayout,
    SiteConfig, TimeoutConfig,
};
pub use encoder::{NoCodes, QueryEncoder};
pub use error::{ConfigError, ConfigResult, Result, TrawlError};
pub use types::{
    FilterField, PaginationMode, Payload, ResponsePacket, ScrollMode, SearchQuery, MAX_PAGE_SIZE,
    MIN_PAGE_SIZE,
};
