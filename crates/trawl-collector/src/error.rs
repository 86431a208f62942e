use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use trawl_browser::BrowserError;
use trawl_core::TrawlError;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("invalid search request: {0}")]
    Validation(String),

    #[error("no search response captured within {timeout:?}")]
    NoData { timeout: Duration },

    #[error("session restricted by the site (code {code}); wait or change network before retrying")]
    Throttled { code: i64 },

    #[error("failed to decode search response: {0}")]
    Decode(#[from] DecodeError),

    #[error("search failed with code {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("browser error: {0}")]
    Driver(#[from] BrowserError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CollectError {
    /// Machine-readable category of this failure.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) => FailureKind::Validation,
            Self::NoData { .. } => FailureKind::NoData,
            Self::Throttled { .. } => FailureKind::Throttled,
            Self::Decode(_) => FailureKind::Decode,
            Self::Remote { .. } => FailureKind::Remote,
            Self::Driver(_) => FailureKind::Driver,
            Self::Io(_) | Self::Serialization(_) => FailureKind::Persist,
        }
    }
}

impl From<TrawlError> for CollectError {
    fn from(err: TrawlError) -> Self {
        match err {
            TrawlError::Validation(reason) => Self::Validation(reason),
            other => Self::Validation(other.to_string()),
        }
    }
}

/// Why a payload could not be turned into a result page.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload has no numeric status field `{0}`")]
    MissingCode(String),

    #[error("payload field `{field}` is not {expected}")]
    Shape {
        field: String,
        expected: &'static str,
    },
}

/// Failure category reported alongside partial results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    NoData,
    Throttled,
    Decode,
    Remote,
    Driver,
    Persist,
}

pub type Result<T> = std::result::Result<T, CollectError>;
