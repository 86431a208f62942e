use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("network interception failed: {0}")]
    Intercept(String),

    #[error("browser session already closed")]
    Closed,
}

impl BrowserError {
    /// Whether retrying the same operation may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NavigationError(_) | Self::Timeout(_))
    }
}
