use rand::seq::SliceRandom;
use trawl_core::BrowserConfig;

/// Desktop user agents used when the configuration supplies none.
const DEFAULT_USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36 Edg/125.0.0.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
];

/// Viewport sizes a desktop visitor plausibly has.
const VIEWPORTS: [(u32, u32); 4] = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

/// Init script that hides the usual automation markers before any page script runs.
pub const ANTI_DETECT_SCRIPT: &str = r"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'languages', { get: () => ['zh-CN', 'zh', 'en'] });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
window.chrome = window.chrome || { runtime: {} };
const originalQuery = window.navigator.permissions && window.navigator.permissions.query;
if (originalQuery) {
    window.navigator.permissions.query = (parameters) =>
        parameters.name === 'notifications'
            ? Promise.resolve({ state: Notification.permission })
            : originalQuery(parameters);
}
";

/// Fingerprint configuration for anti-detection
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl FingerprintConfig {
    /// Generate a randomized fingerprint from the built-in pools
    pub fn randomized() -> Self {
        Self::pick(&[], None)
    }

    /// Pick a fingerprint honoring the configured user agents and window size.
    ///
    /// The configured window size is kept as-is when it differs from the
    /// default; otherwise a common viewport is drawn at random.
    pub fn from_config(config: &BrowserConfig) -> Self {
        let default = BrowserConfig::default();
        let fixed = (config.window_width, config.window_height)
            != (default.window_width, default.window_height);
        Self::pick(
            &config.user_agents,
            fixed.then_some((config.window_width, config.window_height)),
        )
    }

    fn pick(user_agents: &[String], viewport: Option<(u32, u32)>) -> Self {
        let mut rng = rand::thread_rng();

        let user_agent = user_agents
            .choose(&mut rng)
            .cloned()
            .or_else(|| DEFAULT_USER_AGENTS.choose(&mut rng).map(|ua| (*ua).to_string()))
            .unwrap_or_default();

        let (width, height) = viewport
            .or_else(|| VIEWPORTS.choose(&mut rng).copied())
            .unwrap_or(VIEWPORTS[0]);

        Self {
            user_agent,
            viewport_width: width,
            viewport_height: height,
        }
    }
}
