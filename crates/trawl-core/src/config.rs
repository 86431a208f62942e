//! Configuration management for Trawl.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/trawl/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Target site endpoints and payload layout
    pub site: SiteConfig,
    /// Randomized delay table
    pub pacing: PacingConfig,
    /// Capture and element timeouts
    pub timeouts: TimeoutConfig,
    /// Pagination bounds
    pub limits: LimitConfig,
    /// Result output settings
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    ///
    /// Unlike [`AppConfig::load`], a missing file is an error here.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `TRAWL_HEADLESS`: Override browser headless mode (true/false)
    /// - `TRAWL_CHROME_PATH`: Override the Chrome/Chromium executable
    /// - `TRAWL_MAX_PAGES`: Override the page-mode bound
    /// - `TRAWL_MAX_SCROLLS`: Override the scroll-mode bound
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `TRAWL_*` environment overrides to an already loaded config.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TRAWL_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("TRAWL_CHROME_PATH") {
            if !val.is_empty() {
                tracing::debug!("Override browser.chrome_path from env: {}", val);
                self.browser.chrome_path = Some(val);
            }
        }

        if let Ok(val) = std::env::var("TRAWL_MAX_PAGES") {
            if let Ok(max_pages) = val.parse() {
                self.limits.max_pages = max_pages;
                tracing::debug!("Override limits.max_pages from env: {}", max_pages);
            }
        }

        if let Ok(val) = std::env::var("TRAWL_MAX_SCROLLS") {
            if let Ok(max_scrolls) = val.parse() {
                self.limits.max_scroll_times = max_scrolls;
                tracing::debug!("Override limits.max_scroll_times from env: {}", max_scrolls);
            }
        }
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        self.pacing.default.validate("pacing.default")?;
        for (name, range) in &self.pacing.categories {
            range.validate(&format!("pacing.categories.{name}"))?;
        }

        if self.limits.page_size == 0 || self.limits.page_size > 100 {
            return Err(ConfigError::InvalidValue {
                field: "limits.page_size".to_string(),
                reason: format!("must be 1-100, got {}", self.limits.page_size),
            });
        }

        if self.limits.max_pages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_pages".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.limits.max_empty_scrolls == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_empty_scrolls".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.site.capture_pattern.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "site.capture_pattern".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/trawl/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "trawl", "trawl").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/trawl`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "trawl", "trawl").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Directory where collected results are written.
    ///
    /// Falls back to `<data_dir>/results` when `output.result_dir` is unset.
    pub fn result_dir(&self) -> ConfigResult<PathBuf> {
        match &self.output.result_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::data_dir()?.join("results")),
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Chrome/Chromium executable; auto-detected when unset
    pub chrome_path: Option<String>,
    /// User agent pool; one is picked at random per session.
    /// Empty means the built-in desktop pool.
    pub user_agents: Vec<String>,
    /// Extra command-line switches passed to the browser
    pub extra_args: Vec<String>,
    /// Install the automation-masking init script on every new document
    pub anti_detect: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 30,
            chrome_path: None,
            user_agents: Vec::new(),
            extra_args: vec![
                "--disable-blink-features=AutomationControlled".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
                "--disable-extensions".to_string(),
                "--disable-notifications".to_string(),
            ],
            anti_detect: true,
        }
    }
}

/// Target site endpoints and response layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Search page the browser navigates to
    pub base_url: String,
    /// Site home, visited during session warm-up
    pub web_base_url: String,
    /// JSON endpoint the search page calls
    pub api_base_url: String,
    /// Path of the search landing page, relative to `web_base_url`
    pub search_landing_path: String,
    /// Substring a response URL must contain to be captured
    pub capture_pattern: String,
    /// Selector of the result list that must exist before auto-scrolling.
    /// Empty disables the check.
    pub list_selector: String,
    /// Where values live inside a captured payload
    pub payload: PayloadLayout,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.zhipin.com/web/geek/jobs".to_string(),
            web_base_url: "https://www.zhipin.com".to_string(),
            api_base_url: "https://www.zhipin.com/wapi/zpgeek/search/joblist.json".to_string(),
            search_landing_path: "/web/geek/job".to_string(),
            capture_pattern: "joblist.json".to_string(),
            list_selector: ".rec-job-list".to_string(),
            payload: PayloadLayout::default(),
        }
    }
}

/// Field names and sentinel codes of the search API payload.
///
/// The status codes are vendor-specific and change without notice, so they
/// live here rather than in the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadLayout {
    /// Top-level status code field
    pub code_field: String,
    /// Top-level human-readable message field
    pub message_field: String,
    /// Top-level object holding the page data
    pub data_field: String,
    /// Record array inside the data object
    pub records_field: String,
    /// Declared total count inside the data object
    pub total_field: String,
    /// Has-more flag inside the data object
    pub has_more_field: String,
    /// Record field used as the dedup key
    pub id_field: String,
    /// Status code meaning success
    pub success_code: i64,
    /// Status code meaning the session has been restricted
    pub throttle_code: i64,
}

impl Default for PayloadLayout {
    fn default() -> Self {
        Self {
            code_field: "code".to_string(),
            message_field: "message".to_string(),
            data_field: "zpData".to_string(),
            records_field: "jobList".to_string(),
            total_field: "totalCount".to_string(),
            has_more_field: "hasMore".to_string(),
            id_field: "encryptJobId".to_string(),
            success_code: 0,
            throttle_code: 37,
        }
    }
}

/// Inclusive delay range in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Lower bound (ms)
    pub min_ms: u64,
    /// Upper bound (ms)
    pub max_ms: u64,
}

impl DelayRange {
    /// Build a range from whole seconds.
    #[must_use]
    pub const fn secs(min: u64, max: u64) -> Self {
        Self {
            min_ms: min * 1000,
            max_ms: max * 1000,
        }
    }

    /// Lower bound as a `Duration`.
    #[must_use]
    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    /// Upper bound as a `Duration`.
    #[must_use]
    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    fn validate(&self, field: &str) -> ConfigResult<()> {
        if self.min_ms > self.max_ms {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                reason: format!(
                    "min_ms ({}) greater than max_ms ({})",
                    self.min_ms, self.max_ms
                ),
            });
        }
        Ok(())
    }
}

/// Randomized delay table, keyed by category name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Range used for categories missing from the table
    pub default: DelayRange,
    /// Category name to delay range
    pub categories: BTreeMap<String, DelayRange>,
}

impl Default for PacingConfig {
    fn default() -> Self {
        let categories = [
            ("page_load", DelayRange::secs(3, 8)),
            ("scroll", DelayRange::secs(2, 4)),
            ("request", DelayRange::secs(2, 5)),
            ("retry", DelayRange::secs(5, 10)),
            ("initial_access", DelayRange::secs(2, 4)),
            ("search_access", DelayRange::secs(3, 5)),
        ]
        .into_iter()
        .map(|(name, range)| (name.to_string(), range))
        .collect();

        Self {
            default: DelayRange::secs(1, 3),
            categories,
        }
    }
}

/// Capture and element timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Waiting for a page element to appear
    pub element_wait_secs: u64,
    /// Waiting for the search response after a navigation
    pub packet_wait_secs: u64,
    /// Waiting for a response after an automatic scroll
    pub packet_wait_scroll_secs: u64,
    /// Waiting for a response after the operator scrolled manually
    pub packet_wait_after_scroll_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            element_wait_secs: 3,
            packet_wait_secs: 10,
            packet_wait_scroll_secs: 5,
            packet_wait_after_scroll_secs: 3,
        }
    }
}

/// Pagination bounds and retry budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Highest page index visited in page mode
    pub max_pages: u32,
    /// Number of automatic scrolls in scroll mode
    pub max_scroll_times: u32,
    /// Consecutive scrolls without new records before stopping
    pub max_empty_scrolls: u32,
    /// Results requested per page
    pub page_size: u32,
    /// Extra attempts for a failed navigation
    pub navigation_retries: u32,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_pages: 5,
            max_scroll_times: 10,
            max_empty_scrolls: 2,
            page_size: 15,
            navigation_retries: 2,
        }
    }
}

/// Result output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for collected result files
    pub result_dir: Option<PathBuf>,
    /// Keep the latest captured response body next to the results
    pub save_raw_response: bool,
}
