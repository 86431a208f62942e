//! Search URL construction and page movement.

use crate::error::{CollectError, Result};
use std::sync::Arc;
use tracing::{debug, warn};
use trawl_browser::SessionDriver;
use trawl_core::{FilterField, QueryEncoder, SearchQuery, SiteConfig};
use url::Url;

/// Builds search URLs and moves the browser between results.
pub struct PageNavigator {
    driver: Arc<dyn SessionDriver>,
    encoder: Arc<dyn QueryEncoder>,
    site: SiteConfig,
}

impl PageNavigator {
    #[must_use]
    pub fn new(
        driver: Arc<dyn SessionDriver>,
        encoder: Arc<dyn QueryEncoder>,
        site: SiteConfig,
    ) -> Self {
        Self {
            driver,
            encoder,
            site,
        }
    }

    /// URL of the search page for `query`, including its page index.
    pub fn build_web_url(&self, query: &SearchQuery) -> Result<String> {
        let mut params = self.filter_params(query);
        params.push(("page", query.page.to_string()));
        params.push(("pageSize", query.page_size.to_string()));
        Self::compose(&self.site.base_url, &params)
    }

    /// URL of the JSON endpoint the search page calls for `query`.
    pub fn build_api_url(&self, query: &SearchQuery) -> Result<String> {
        let mut params = vec![
            ("scene", "1".to_string()),
            ("page", query.page.to_string()),
            ("pageSize", query.page_size.to_string()),
        ];
        params.extend(self.filter_params(query));
        Self::compose(&self.site.api_base_url, &params)
    }

    /// Load `url` in the browser.
    pub async fn navigate(&self, url: &str) -> trawl_browser::Result<()> {
        debug!(url, "loading search page");
        self.driver.navigate(url).await
    }

    /// Scroll to the bottom of the current page.
    pub async fn scroll(&self) -> trawl_browser::Result<()> {
        self.driver.scroll_to_bottom().await
    }

    /// Encoded query parameters, in the order the site's own UI emits them.
    ///
    /// Values without a known code are left out so one unknown filter does
    /// not sink the whole search.
    fn filter_params(&self, query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        if let Some(text) = query.text() {
            params.push(("query", text.to_string()));
        }

        for field in FilterField::ALL {
            let Some(value) = query.filter(field) else {
                continue;
            };

            // Districts are only meaningful inside a chosen city
            if field == FilterField::District && query.filter(FilterField::City).is_none() {
                debug!(district = value, "ignoring district without city");
                continue;
            }

            match self.encoder.encode(field, value) {
                Some(code) => params.push((field.param_name(), code)),
                None if field == FilterField::City => {
                    warn!(city = value, "no code for city, searching without city filter");
                }
                None => debug!(%field, value, "no code for filter value, omitting"),
            }
        }

        params
    }

    fn compose(base: &str, params: &[(&str, String)]) -> Result<String> {
        let url = Url::parse_with_params(base, params)
            .map_err(|e| CollectError::Validation(format!("invalid base URL {base}: {e}")))?;
        Ok(url.into())
    }
}
