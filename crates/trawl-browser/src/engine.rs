use crate::actions::{extract_domain, SessionDriver};
use crate::error::{BrowserError, Result};
use crate::fingerprint::{FingerprintConfig, ANTI_DETECT_SCRIPT};
use crate::intercept::Interceptor;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use futures_util::stream::StreamExt;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use trawl_core::{BrowserConfig, ResponsePacket};

/// Poll interval while waiting for a selector.
const SELECTOR_POLL: Duration = Duration::from_millis(250);

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Browser automation engine
///
/// Owns one Chromium process and a single tab. All [`SessionDriver`]
/// operations act on that tab.
pub struct BrowserEngine {
    browser: Mutex<Option<Browser>>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
    page: Page,
    fingerprint: FingerprintConfig,
    navigation_timeout: Duration,
    interceptor: Mutex<Option<Interceptor>>,
    sequence: Arc<AtomicU64>,
}

impl BrowserEngine {
    /// Launch a browser with default configuration
    pub async fn new() -> Result<Self> {
        Self::launch(&BrowserConfig::default()).await
    }

    /// Launch a browser with the given configuration
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let fingerprint = FingerprintConfig::from_config(config);

        let mut builder = CdpConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .arg(format!("--user-agent={}", fingerprint.user_agent));

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        for arg in &config.extra_args {
            builder = builder.arg(arg.clone());
        }

        let cdp_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Spawn browser handler
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler event error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(BrowserError::ChromiumError(e.to_string()));
            }
        };

        if config.anti_detect {
            page.execute(AddScriptToEvaluateOnNewDocumentParams::new(ANTI_DETECT_SCRIPT))
                .await
                .map_err(|e| BrowserError::ChromiumError(format!("install init script: {e}")))?;
        }

        info!(
            headless = config.headless,
            width = fingerprint.viewport_width,
            height = fingerprint.viewport_height,
            "browser session started"
        );

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler_task: Mutex::new(Some(handler_task)),
            page,
            fingerprint,
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            interceptor: Mutex::new(None),
            sequence: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Fingerprint this session presents
    pub fn fingerprint(&self) -> &FingerprintConfig {
        &self.fingerprint
    }

    async fn ensure_open(&self) -> Result<()> {
        if self.browser.lock().await.is_none() {
            return Err(BrowserError::Closed);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionDriver for BrowserEngine {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.ensure_open().await?;
        let domain = extract_domain(url)?;
        debug!(domain = %domain, url = %url, "navigating");

        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::NavigationError(format!("{url}: {e}"))),
            Err(_) => Err(BrowserError::Timeout(format!(
                "navigation to {domain} exceeded {}s",
                self.navigation_timeout.as_secs()
            ))),
        }
    }

    async fn current_body(&self) -> Result<String> {
        self.ensure_open().await?;
        self.page
            .content()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.ensure_open().await?;
        self.page
            .evaluate(SCROLL_TO_BOTTOM)
            .await
            .map_err(|e| BrowserError::ChromiumError(format!("scroll: {e}")))?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        self.ensure_open().await?;
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                debug!(selector, "selector did not appear in time");
                return Ok(false);
            }
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    }

    async fn intercept_begin(&self, pattern: &str) -> Result<()> {
        self.ensure_open().await?;
        let mut slot = self.interceptor.lock().await;

        if let Some(previous) = slot.take() {
            debug!(previous = previous.pattern(), pattern, "replacing running capture");
        }

        *slot = Some(Interceptor::start(&self.page, pattern, Arc::clone(&self.sequence)).await?);
        debug!(pattern, "network capture armed");
        Ok(())
    }

    async fn intercept_await(&self, timeout: Duration) -> Result<Vec<ResponsePacket>> {
        let mut slot = self.interceptor.lock().await;
        match slot.as_mut() {
            Some(interceptor) => interceptor.next_batch(timeout).await,
            None => Ok(Vec::new()),
        }
    }

    async fn intercept_stop(&self) -> Result<()> {
        if self.interceptor.lock().await.take().is_some() {
            debug!("network capture stopped");
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.interceptor.lock().await.take();

        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };

        if let Err(e) = browser.close().await {
            warn!(error = %e, "browser close command failed");
        }
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "waiting for browser exit failed");
        }
        if let Some(task) = self.handler_task.lock().await.take() {
            task.abort();
        }

        info!("browser session closed");
        Ok(())
    }
}
