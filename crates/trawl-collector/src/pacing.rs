//! Randomized delays between browser operations.
//!
//! Every navigation, scroll and retry is preceded or followed by a pause
//! drawn uniformly from the range configured for its category, so the
//! session's timing does not look scripted.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::trace;
use trawl_core::{DelayRange, PacingConfig};

/// Category names with a default range in [`PacingConfig`].
pub mod category {
    /// After loading a search page
    pub const PAGE_LOAD: &str = "page_load";
    /// After an automatic scroll
    pub const SCROLL: &str = "scroll";
    /// Between two page requests
    pub const REQUEST: &str = "request";
    /// Before retrying a failed navigation
    pub const RETRY: &str = "retry";
    /// After opening the site home during warm-up
    pub const INITIAL_ACCESS: &str = "initial_access";
    /// After opening the search landing page during warm-up
    pub const SEARCH_ACCESS: &str = "search_access";
}

/// Samples and sleeps randomized delays per category.
#[derive(Debug)]
pub struct PacingController {
    config: PacingConfig,
    rng: StdRng,
}

impl PacingController {
    /// Create a controller seeded from system entropy.
    #[must_use]
    pub fn new(config: PacingConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a controller with a fixed seed, for reproducible delays.
    #[must_use]
    pub fn with_seed(config: PacingConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Range used for a category; unknown names get the default range.
    #[must_use]
    pub fn range(&self, category: &str) -> DelayRange {
        self.config
            .categories
            .get(category)
            .copied()
            .unwrap_or(self.config.default)
    }

    /// Draw a delay for `category` without sleeping.
    pub fn sample(&mut self, category: &str) -> Duration {
        let range = self.range(category);
        let (low, high) = if range.min_ms <= range.max_ms {
            (range.min_ms, range.max_ms)
        } else {
            (range.max_ms, range.min_ms)
        };
        Duration::from_millis(self.rng.gen_range(low..=high))
    }

    /// Sleep for a delay drawn for `category` and return it.
    pub async fn wait(&mut self, category: &str) -> Duration {
        self.wait_scaled(category, 1).await
    }

    /// Sleep for `factor` times a delay drawn for `category`.
    ///
    /// Used for linear backoff between retries.
    pub async fn wait_scaled(&mut self, category: &str, factor: u32) -> Duration {
        let delay = self.sample(category) * factor.max(1);
        trace!(category, ?delay, "pacing");
        tokio::time::sleep(delay).await;
        delay
    }
}
