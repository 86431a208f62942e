//! Armed/disarmed wrapper over the driver's response interception.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use trawl_browser::{Result, SessionDriver};
use trawl_core::ResponsePacket;

/// Captures the responses a page issues for a URL pattern.
///
/// Re-arming with [`begin`](Self::begin) while armed restarts the capture
/// with the new pattern; packets not yet awaited are discarded.
pub struct NetworkCapture {
    driver: Arc<dyn SessionDriver>,
    pattern: Option<String>,
}

impl NetworkCapture {
    #[must_use]
    pub fn new(driver: Arc<dyn SessionDriver>) -> Self {
        Self {
            driver,
            pattern: None,
        }
    }

    /// Start capturing responses whose URL contains `pattern`.
    pub async fn begin(&mut self, pattern: &str) -> Result<()> {
        if let Some(previous) = &self.pattern {
            debug!(previous = %previous, pattern, "re-arming capture");
        }
        // Disarmed until the driver confirms the new filter
        self.pattern = None;
        self.driver.intercept_begin(pattern).await?;
        self.pattern = Some(pattern.to_string());
        Ok(())
    }

    /// Wait up to `timeout` for matching responses.
    ///
    /// Returns the packets received since the previous call, in arrival
    /// order; empty on timeout or when disarmed.
    pub async fn await_packets(&mut self, timeout: Duration) -> Result<Vec<ResponsePacket>> {
        if self.pattern.is_none() {
            return Ok(Vec::new());
        }

        let mut packets = self.driver.intercept_await(timeout).await?;
        packets.sort_by_key(ResponsePacket::sequence);
        debug!(count = packets.len(), "capture returned packets");
        Ok(packets)
    }

    /// Disarm. Does nothing when not armed.
    pub async fn stop(&mut self) -> Result<()> {
        if self.pattern.take().is_some() {
            self.driver.intercept_stop().await?;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.pattern.is_some()
    }

    /// Pattern currently armed, if any.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }
}
