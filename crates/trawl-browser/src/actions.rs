use crate::error::{BrowserError, Result};
use std::time::Duration;
use trawl_core::ResponsePacket;

/// Operations the collector needs from a live browser session.
///
/// One implementation drives a real browser; tests script their own.
#[async_trait::async_trait]
pub trait SessionDriver: Send + Sync {
    /// Navigate to a URL and wait for the document to load
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Rendered HTML of the current document
    async fn current_body(&self) -> Result<String>;

    /// Scroll the current document to the bottom to trigger lazy loading
    async fn scroll_to_bottom(&self) -> Result<()>;

    /// Wait for a selector to appear; `Ok(false)` when the timeout elapses first
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Start capturing responses whose URL contains `pattern`.
    /// Replaces any capture already running and drops its unread packets.
    async fn intercept_begin(&self, pattern: &str) -> Result<()>;

    /// Wait up to `timeout` for at least one captured response and return
    /// every packet received since the last call, oldest first.
    /// Returns an empty list on timeout or when no capture is running.
    async fn intercept_await(&self, timeout: Duration) -> Result<Vec<ResponsePacket>>;

    /// Stop capturing. Safe to call when no capture is running.
    async fn intercept_stop(&self) -> Result<()>;

    /// Shut the session down. Safe to call more than once.
    async fn close(&self) -> Result<()>;
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {e}")))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(ToString::to_string)
}
