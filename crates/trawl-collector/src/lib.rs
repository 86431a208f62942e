//! Trawl Collector - paginated job search collection.
//!
//! This crate drives a browser session through a job search on a site whose
//! results arrive as JSON API responses. It captures those responses rather
//! than scraping the rendered page, and handles pacing, deduplication and
//! partial-result reporting when the site pushes back.
//!
//! # Features
//!
//! - Page mode (successive page URLs) and scroll mode (automatic or
//!   operator-driven lazy loading)
//! - Randomized, category-keyed delays between every browser action
//! - Navigation retry with linear backoff; throttling is never retried
//! - Session-wide deduplication on the record identifier
//! - Failures keep everything collected so far
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trawl_collector::{CollectorSettings, SearchOrchestrator};
//! use trawl_core::{AppConfig, PaginationMode, SearchQuery};
//!
//! let config = AppConfig::load_with_env()?;
//! let mut orchestrator = SearchOrchestrator::new(
//!     Arc::new(browser_engine),
//!     Arc::new(code_registry),
//!     CollectorSettings::from_config(&config),
//! );
//!
//! orchestrator.establish_session().await?;
//! let outcome = orchestrator
//!     .run(&SearchQuery::keywords("Python").with_city("北京"), PaginationMode::Page { max_pages: 3 })
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod capture;
pub mod decoder;
pub mod dedup;
#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod filter;
pub mod navigator;
pub mod orchestrator;
pub mod pacing;
#[allow(missing_docs)]
pub mod record;
#[allow(missing_docs)]
pub mod sink;
#[allow(missing_docs)]
pub mod summary;

// Re-export commonly used types
pub use capture::NetworkCapture;
pub use decoder::{DecodeOutcome, ResponseDecoder, ResultPage};
pub use dedup::Deduplicator;
pub use error::{CollectError, DecodeError, FailureKind, Result};
pub use filter::RecordFilter;
pub use navigator::PageNavigator;
pub use orchestrator::{
    CollectionOutcome, CollectionState, CollectorSettings, Phase, RunStatus, ScrollPrompt,
    SearchOrchestrator,
};
pub use pacing::PacingController;
pub use record::JobRecord;
pub use sink::{JsonFileSink, PersistenceSink, ResultDocument, RAW_RESPONSE_FILE};
pub use summary::{Bucket, CollectionSummary, RunInfo};
