//! Shared types used across Trawl.
//!
//! This module defines the search request model and the captured-response
//! types exchanged between the browser driver and the collector.

use crate::error::TrawlError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest accepted page size.
pub const MIN_PAGE_SIZE: u32 = 1;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query filters whose human-readable value must be translated into a site code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    /// City name
    City,
    /// Business district inside a city
    District,
    /// Required work experience
    Experience,
    /// Required degree
    Degree,
    /// Salary band
    Salary,
    /// Company headcount band
    Scale,
    /// Company funding stage
    Stage,
    /// Full-time, part-time, internship...
    JobType,
}

impl FilterField {
    /// All fields, in the order they are appended to a search URL.
    pub const ALL: [FilterField; 8] = [
        Self::City,
        Self::District,
        Self::Experience,
        Self::Degree,
        Self::Salary,
        Self::Scale,
        Self::Stage,
        Self::JobType,
    ];

    /// Query-string parameter the site expects for this field.
    #[must_use]
    pub fn param_name(&self) -> &'static str {
        match self {
            Self::City => "city",
            Self::District => "multiBusinessDistrict",
            Self::Experience => "experience",
            Self::Degree => "degree",
            Self::Salary => "salary",
            Self::Scale => "scale",
            Self::Stage => "stage",
            Self::JobType => "jobType",
        }
    }

    /// Name of the code table holding this field's values.
    #[must_use]
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::City => "city",
            Self::District => "district",
            Self::Experience => "experience",
            Self::Degree => "degree",
            Self::Salary => "salary",
            Self::Scale => "scale",
            Self::Stage => "stage",
            Self::JobType => "jobType",
        }
    }

    /// Resolve a code table name back to a field.
    #[must_use]
    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.table_name() == name)
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A single search request against the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text keywords
    pub query: Option<String>,
    /// City name (human readable)
    pub city: Option<String>,
    /// Business district name (human readable)
    pub district: Option<String>,
    /// Experience filter
    pub experience: Option<String>,
    /// Degree filter
    pub degree: Option<String>,
    /// Salary band filter
    pub salary: Option<String>,
    /// Company scale filter
    pub scale: Option<String>,
    /// Funding stage filter
    pub stage: Option<String>,
    /// Job type filter
    pub job_type: Option<String>,
    /// 1-based page index
    pub page: u32,
    /// Results per page
    pub page_size: u32,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: None,
            city: None,
            district: None,
            experience: None,
            degree: None,
            salary: None,
            scale: None,
            stage: None,
            job_type: None,
            page: 1,
            page_size: 15,
        }
    }
}

impl SearchQuery {
    /// Create a keyword query with default paging.
    #[must_use]
    pub fn keywords(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// Set the city filter.
    #[must_use]
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Set a categorical filter.
    #[must_use]
    pub fn with_filter(mut self, field: FilterField, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match field {
            FilterField::City => self.city = value,
            FilterField::District => self.district = value,
            FilterField::Experience => self.experience = value,
            FilterField::Degree => self.degree = value,
            FilterField::Salary => self.salary = value,
            FilterField::Scale => self.scale = value,
            FilterField::Stage => self.stage = value,
            FilterField::JobType => self.job_type = value,
        }
        self
    }

    /// Set the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the page index.
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Human-readable value of a filter, if set and non-blank.
    #[must_use]
    pub fn filter(&self, field: FilterField) -> Option<&str> {
        let value = match field {
            FilterField::City => &self.city,
            FilterField::District => &self.district,
            FilterField::Experience => &self.experience,
            FilterField::Degree => &self.degree,
            FilterField::Salary => &self.salary,
            FilterField::Scale => &self.scale,
            FilterField::Stage => &self.stage,
            FilterField::JobType => &self.job_type,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// Keyword text, if set and non-blank.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Validate the query before any browser work happens.
    ///
    /// # Errors
    /// Returns [`TrawlError::Validation`] when the page index is 0, the page
    /// size is outside 1-100, or neither keywords nor a city are given.
    pub fn validate(&self) -> Result<(), TrawlError> {
        if self.text().is_none() && self.filter(FilterField::City).is_none() {
            return Err(TrawlError::Validation(
                "at least one of query text or city is required".to_string(),
            ));
        }

        if self.page < 1 {
            return Err(TrawlError::Validation(format!(
                "page index must be at least 1, got {}",
                self.page
            )));
        }

        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(TrawlError::Validation(format!(
                "page size must be {MIN_PAGE_SIZE}-{MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }

        Ok(())
    }
}

/// How lazy-loaded results are triggered in scroll mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollMode {
    /// The collector scrolls the page itself
    Auto,
    /// An operator scrolls and confirms before each capture
    Manual,
}

/// Pagination strategy for one run, chosen once at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaginationMode {
    /// Navigate to successive page URLs
    Page {
        /// Highest page index to visit
        max_pages: u32,
    },
    /// Stay on one URL and scroll for more results
    Scroll {
        /// Automatic or operator-driven scrolling
        mode: ScrollMode,
        /// Upper bound on automatic scrolls
        max_scrolls: u32,
    },
}

impl PaginationMode {
    /// Short label used in logs and summaries.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Page { .. } => "page",
            Self::Scroll {
                mode: ScrollMode::Auto,
                ..
            } => "scroll-auto",
            Self::Scroll {
                mode: ScrollMode::Manual,
                ..
            } => "scroll-manual",
        }
    }
}

/// Raw body of a captured response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Body delivered as text
    Text(String),
    /// Body delivered as raw bytes (e.g. base64-decoded by the driver)
    Bytes(Vec<u8>),
}

impl Payload {
    /// Size of the payload in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Bytes(bytes) => bytes.len(),
        }
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One intercepted network response.
///
/// Immutable once captured; the sequence number orders packets by arrival
/// within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePacket {
    sequence: u64,
    url: String,
    payload: Payload,
}

impl ResponsePacket {
    /// Wrap a captured response.
    #[must_use]
    pub fn new(sequence: u64, url: impl Into<String>, payload: Payload) -> Self {
        Self {
            sequence,
            url: url.into(),
            payload,
        }
    }

    /// Arrival sequence number.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// URL the response was served from.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw body.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}
