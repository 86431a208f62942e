//! Search orchestrator for paginated result collection.
//!
//! This module provides the `SearchOrchestrator`, which drives one browser
//! session through a search: it arms network capture, loads or scrolls the
//! results page, decodes the captured API responses, deduplicates records and
//! decides whether to continue. Failures never discard what was already
//! collected; they end the run with a reason attached to the partial results.

use crate::capture::NetworkCapture;
use crate::decoder::{DecodeOutcome, ResponseDecoder};
use crate::dedup::Deduplicator;
use crate::error::{CollectError, FailureKind, Result};
use crate::navigator::PageNavigator;
use crate::pacing::{category, PacingController};
use crate::record::JobRecord;
use crate::sink::JsonFileSink;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};
use trawl_browser::SessionDriver;
use trawl_core::{
    AppConfig, LimitConfig, PacingConfig, PaginationMode, QueryEncoder, ResponsePacket,
    ScrollMode, SearchQuery, SiteConfig, TimeoutConfig,
};
use uuid::Uuid;

/// Markers of the site's anti-bot interstitial.
const VERIFICATION_MARKERS: [&str; 4] = ["安全验证", "verify", "captcha", "security-check"];

/// Settings a run reads; a subset of [`AppConfig`].
#[derive(Debug, Clone, Default)]
pub struct CollectorSettings {
    /// Endpoints, capture pattern and payload layout
    pub site: SiteConfig,
    /// Delay ranges
    pub pacing: PacingConfig,
    /// Capture and element timeouts
    pub timeouts: TimeoutConfig,
    /// Pagination bounds and retry budget
    pub limits: LimitConfig,
}

impl CollectorSettings {
    /// Take the collector's sections from the application configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            site: config.site.clone(),
            pacing: config.pacing.clone(),
            timeouts: config.timeouts.clone(),
            limits: config.limits.clone(),
        }
    }
}

/// Operator hook for manual scroll mode.
#[async_trait::async_trait]
pub trait ScrollPrompt: Send {
    /// Ask the operator to scroll the page; `false` ends the collection.
    ///
    /// `round` starts at 1; `collected` is the number of records so far.
    async fn confirm(&mut self, round: u32, collected: usize) -> bool;
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not started
    Idle,
    /// Loading a page or scrolling
    Navigating,
    /// Waiting for captured responses
    AwaitingResponse,
    /// Decoding a captured response
    Decoding,
    /// Appending novel records
    Accumulating,
    /// Deciding whether to continue
    Paginating,
    /// Finished normally
    Terminated,
    /// Finished with an error
    Failed,
}

/// Everything one run has accumulated.
///
/// Owned by a single run and consumed into its [`CollectionOutcome`].
#[derive(Debug)]
pub struct CollectionState {
    records: Vec<JobRecord>,
    dedup: Deduplicator,
    packets_processed: usize,
    attempts: u32,
    total_count: Option<u64>,
    first_page_seen: bool,
    phase: Phase,
}

impl CollectionState {
    /// Create an empty state deduplicating on `id_field`.
    #[must_use]
    pub fn new(id_field: &str) -> Self {
        Self {
            records: Vec::new(),
            dedup: Deduplicator::new(id_field),
            packets_processed: 0,
            attempts: 0,
            total_count: None,
            first_page_seen: false,
            phase: Phase::Idle,
        }
    }

    /// Append the novel records of a batch; returns how many were new.
    pub fn accept(&mut self, raw_records: &[Value]) -> usize {
        let fresh = self.dedup.accept(raw_records);
        let count = fresh.len();
        self.records.extend(fresh);
        count
    }

    /// Records accepted so far, in acceptance order.
    #[must_use]
    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    /// Captured packets consumed so far.
    #[must_use]
    pub fn packets_processed(&self) -> usize {
        self.packets_processed
    }

    /// Pages navigated or scrolls performed so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Total declared by the first decoded page.
    #[must_use]
    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        trace!(from = ?self.phase, to = ?phase, "phase");
        self.phase = phase;
    }

    fn record_first_total(&mut self, total: Option<u64>) {
        if !self.first_page_seen {
            self.first_page_seen = true;
            self.total_count = total;
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// A stop condition was reached
    Terminated,
    /// A failure ended the run early
    Failed {
        /// Failure category
        kind: FailureKind,
        /// Human-readable reason
        message: String,
    },
}

/// Result of one run, successful or not.
#[derive(Debug, Clone)]
pub struct CollectionOutcome {
    /// Unique id of the run
    pub run_id: Uuid,
    /// Pagination mode used
    pub mode: PaginationMode,
    /// How the run ended
    pub status: RunStatus,
    /// Accepted records, including those gathered before a failure
    pub records: Vec<JobRecord>,
    /// Pages navigated (page mode) or scrolls performed (scroll mode)
    pub attempts: u32,
    /// Captured packets consumed
    pub packets_processed: usize,
    /// Total declared by the first page, if any
    pub total_count: Option<u64>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run ended
    pub finished_at: DateTime<Utc>,
}

impl CollectionOutcome {
    /// Whether the run reached a normal stop condition.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Terminated
    }

    /// Failure category, if the run failed.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.status {
            RunStatus::Terminated => None,
            RunStatus::Failed { kind, .. } => Some(*kind),
        }
    }
}

/// Per-batch tallies used for stop decisions.
#[derive(Debug, Default)]
struct BatchStats {
    raw_records: usize,
    new_records: usize,
    has_more: bool,
}

/// Drives one browser session through a paginated search.
pub struct SearchOrchestrator {
    driver: Arc<dyn SessionDriver>,
    navigator: PageNavigator,
    capture: NetworkCapture,
    decoder: ResponseDecoder,
    pacing: PacingController,
    settings: CollectorSettings,
    prompt: Option<Box<dyn ScrollPrompt>>,
    raw_sink: Option<JsonFileSink>,
}

impl SearchOrchestrator {
    /// Create an orchestrator over a session and a query encoder.
    #[must_use]
    pub fn new(
        driver: Arc<dyn SessionDriver>,
        encoder: Arc<dyn QueryEncoder>,
        settings: CollectorSettings,
    ) -> Self {
        Self {
            navigator: PageNavigator::new(Arc::clone(&driver), encoder, settings.site.clone()),
            capture: NetworkCapture::new(Arc::clone(&driver)),
            decoder: ResponseDecoder::new(settings.site.payload.clone()),
            pacing: PacingController::new(settings.pacing.clone()),
            driver,
            settings,
            prompt: None,
            raw_sink: None,
        }
    }

    /// Set the operator prompt used by manual scroll mode.
    #[must_use]
    pub fn with_prompt(mut self, prompt: Box<dyn ScrollPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Keep a copy of every captured response body in `sink`'s directory.
    ///
    /// Each capture overwrites the previous one, so the last response of a
    /// run is what remains.
    #[must_use]
    pub fn with_raw_dump(mut self, sink: JsonFileSink) -> Self {
        self.raw_sink = Some(sink);
        self
    }

    /// Replace the pacing controller, e.g. with a seeded one.
    #[must_use]
    pub fn with_pacing(mut self, pacing: PacingController) -> Self {
        self.pacing = pacing;
        self
    }

    /// URL builder for this orchestrator's site.
    #[must_use]
    pub fn navigator(&self) -> &PageNavigator {
        &self.navigator
    }

    /// Visit the site home and the search landing page like a person would
    /// before searching.
    pub async fn establish_session(&mut self) -> Result<()> {
        let home = self.settings.site.web_base_url.clone();
        let landing = format!(
            "{}{}",
            home.trim_end_matches('/'),
            self.settings.site.search_landing_path
        );

        info!(url = %home, "establishing session");
        self.navigate_with_retry(&home, false).await?;
        self.pacing.wait(category::INITIAL_ACCESS).await;

        self.navigate_with_retry(&landing, false).await?;
        self.pacing.wait(category::SEARCH_ACCESS).await;

        info!("session established");
        Ok(())
    }

    /// Run one search to completion.
    ///
    /// Only invalid input is returned as `Err`, before the browser is
    /// touched. Every other failure is reported in the outcome's status
    /// together with the records gathered up to that point.
    pub async fn run(
        &mut self,
        query: &SearchQuery,
        mode: PaginationMode,
    ) -> Result<CollectionOutcome> {
        self.validate(query, mode)?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut state = CollectionState::new(&self.settings.site.payload.id_field);

        info!(
            %run_id,
            mode = mode.label(),
            query = query.text().unwrap_or(""),
            city = query.filter(trawl_core::FilterField::City).unwrap_or(""),
            "starting collection"
        );

        let result = match mode {
            PaginationMode::Page { max_pages } => {
                self.collect_pages(query, max_pages, &mut state).await
            }
            PaginationMode::Scroll {
                mode: scroll_mode,
                max_scrolls,
            } => {
                self.collect_scroll(query, scroll_mode, max_scrolls, &mut state)
                    .await
            }
        };

        if let Err(e) = self.capture.stop().await {
            warn!(error = %e, "failed to stop network capture");
        }

        let status = match result {
            Ok(()) => {
                state.enter(Phase::Terminated);
                info!(
                    %run_id,
                    records = state.records.len(),
                    attempts = state.attempts,
                    packets = state.packets_processed,
                    "collection finished"
                );
                RunStatus::Terminated
            }
            Err(err) => {
                state.enter(Phase::Failed);
                if matches!(err, CollectError::Driver(_)) {
                    if let Err(e) = self.driver.close().await {
                        warn!(error = %e, "failed to close browser session after driver error");
                    }
                }
                error!(
                    %run_id,
                    kind = ?err.kind(),
                    error = %err,
                    records = state.records.len(),
                    "collection failed, keeping partial results"
                );
                RunStatus::Failed {
                    kind: err.kind(),
                    message: err.to_string(),
                }
            }
        };

        let invalid = state.records.iter().filter(|r| r.validate().is_err()).count();
        if invalid > 0 {
            warn!(invalid, "records missing name, id or company");
        }

        Ok(CollectionOutcome {
            run_id,
            mode,
            status,
            records: state.records,
            attempts: state.attempts,
            packets_processed: state.packets_processed,
            total_count: state.total_count,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Check a request without touching the session.
    ///
    /// `has_prompt` tells whether an operator prompt will be available for
    /// manual scroll mode.
    pub fn check_request(
        query: &SearchQuery,
        mode: PaginationMode,
        has_prompt: bool,
    ) -> Result<()> {
        query.validate()?;

        match mode {
            PaginationMode::Page { max_pages } => {
                if max_pages == 0 {
                    return Err(CollectError::Validation(
                        "max_pages must be at least 1".to_string(),
                    ));
                }
                if query.page > max_pages {
                    return Err(CollectError::Validation(format!(
                        "start page {} is beyond max_pages {max_pages}",
                        query.page
                    )));
                }
            }
            PaginationMode::Scroll {
                mode: ScrollMode::Manual,
                ..
            } if !has_prompt => {
                return Err(CollectError::Validation(
                    "manual scroll mode needs an operator prompt".to_string(),
                ));
            }
            PaginationMode::Scroll { .. } => {}
        }

        Ok(())
    }

    fn validate(&self, query: &SearchQuery, mode: PaginationMode) -> Result<()> {
        Self::check_request(query, mode, self.prompt.is_some())?;

        if self.settings.site.capture_pattern.trim().is_empty() {
            return Err(CollectError::Validation(
                "capture pattern must not be empty".to_string(),
            ));
        }

        self.navigator.build_web_url(query).map(|_| ())
    }

    async fn collect_pages(
        &mut self,
        query: &SearchQuery,
        max_pages: u32,
        state: &mut CollectionState,
    ) -> Result<()> {
        let timeout = secs(self.settings.timeouts.packet_wait_secs);
        let mut page = query.page;

        loop {
            state.attempts += 1;
            let url = self.navigator.build_web_url(&query.clone().with_page(page))?;

            state.enter(Phase::Navigating);
            self.navigate_with_retry(&url, true).await?;
            self.pacing.wait(category::PAGE_LOAD).await;

            state.enter(Phase::AwaitingResponse);
            let packets = self.capture.await_packets(timeout).await?;
            if packets.is_empty() {
                self.report_blank_page(&query.clone().with_page(page)).await;
                return Err(CollectError::NoData { timeout });
            }

            let stats = self.process_batch(&packets, state)?;
            state.enter(Phase::Paginating);
            info!(
                page,
                raw = stats.raw_records,
                new = stats.new_records,
                collected = state.records.len(),
                "page collected"
            );

            if stats.raw_records == 0 {
                info!(page, "page returned no records, stopping");
                return Ok(());
            }
            if !stats.has_more {
                info!(page, "site reports no more pages");
                return Ok(());
            }
            if page >= max_pages {
                info!(page, max_pages, "reached page limit");
                return Ok(());
            }

            page += 1;
            self.pacing.wait(category::REQUEST).await;
        }
    }

    async fn collect_scroll(
        &mut self,
        query: &SearchQuery,
        scroll_mode: ScrollMode,
        max_scrolls: u32,
        state: &mut CollectionState,
    ) -> Result<()> {
        let url = self.navigator.build_web_url(query)?;

        state.enter(Phase::Navigating);
        self.navigate_with_retry(&url, true).await?;
        self.pacing.wait(category::PAGE_LOAD).await;

        state.enter(Phase::AwaitingResponse);
        let initial = self
            .capture
            .await_packets(secs(self.settings.timeouts.packet_wait_secs))
            .await?;
        if initial.is_empty() {
            warn!("no response captured on initial load, continuing with scrolling");
        } else {
            let stats = self.process_batch(&initial, state)?;
            info!(new = stats.new_records, "initial load collected");
        }

        match scroll_mode {
            ScrollMode::Auto => self.auto_scroll(max_scrolls, state).await,
            ScrollMode::Manual => {
                let Some(mut prompt) = self.prompt.take() else {
                    return Err(CollectError::Validation(
                        "manual scroll mode needs an operator prompt".to_string(),
                    ));
                };
                let result = self.manual_scroll(prompt.as_mut(), max_scrolls, state).await;
                self.prompt = Some(prompt);
                result
            }
        }
    }

    async fn auto_scroll(&mut self, max_scrolls: u32, state: &mut CollectionState) -> Result<()> {
        let selector = self.settings.site.list_selector.clone();
        if !selector.is_empty() {
            let wait = secs(self.settings.timeouts.element_wait_secs);
            if !self.driver.wait_for_selector(&selector, wait).await? {
                warn!(selector = %selector, "result list not found, skipping scrolling");
                return Ok(());
            }
        }

        let timeout = secs(self.settings.timeouts.packet_wait_scroll_secs);
        let max_empty = self.settings.limits.max_empty_scrolls.max(1);
        let mut empty_streak = 0;

        for round in 1..=max_scrolls {
            state.attempts += 1;
            state.enter(Phase::Navigating);
            self.navigator.scroll().await?;
            self.pacing.wait(category::SCROLL).await;

            state.enter(Phase::AwaitingResponse);
            let packets = self.capture.await_packets(timeout).await?;
            let new_records = if packets.is_empty() {
                debug!(round, "no response after scroll");
                0
            } else {
                self.process_batch(&packets, state)?.new_records
            };

            state.enter(Phase::Paginating);
            if new_records == 0 {
                empty_streak += 1;
                if empty_streak >= max_empty {
                    info!(round, empty_streak, "no new records, stopping");
                    return Ok(());
                }
            } else {
                empty_streak = 0;
                info!(
                    round,
                    new = new_records,
                    collected = state.records.len(),
                    "scroll collected"
                );
            }
        }

        info!(max_scrolls, "reached scroll limit");
        Ok(())
    }

    async fn manual_scroll(
        &mut self,
        prompt: &mut dyn ScrollPrompt,
        max_scrolls: u32,
        state: &mut CollectionState,
    ) -> Result<()> {
        let timeout = secs(self.settings.timeouts.packet_wait_after_scroll_secs);

        for round in 1..=max_scrolls {
            if !prompt.confirm(round, state.records.len()).await {
                info!(round, "operator finished scrolling");
                return Ok(());
            }
            state.attempts += 1;

            state.enter(Phase::AwaitingResponse);
            let packets = self.capture.await_packets(timeout).await?;
            if packets.is_empty() {
                info!(round, "no response after scroll");
                continue;
            }

            let stats = self.process_batch(&packets, state)?;
            state.enter(Phase::Paginating);
            info!(
                round,
                new = stats.new_records,
                collected = state.records.len(),
                "scroll collected"
            );
        }

        info!(max_scrolls, "reached scroll limit");
        Ok(())
    }

    /// Decode and accumulate a capture batch in arrival order.
    ///
    /// The first throttled or failed response ends the batch; records from
    /// earlier packets stay accumulated.
    fn process_batch(
        &self,
        packets: &[ResponsePacket],
        state: &mut CollectionState,
    ) -> Result<BatchStats> {
        let mut stats = BatchStats::default();

        for packet in packets {
            state.enter(Phase::Decoding);
            state.packets_processed += 1;

            if let Some(sink) = &self.raw_sink {
                if let Err(e) = sink.save_raw(packet) {
                    warn!(error = %e, "failed to save raw response");
                }
            }

            match self.decoder.decode(packet)? {
                DecodeOutcome::Success(page) => {
                    state.enter(Phase::Accumulating);
                    state.record_first_total(page.total_count);
                    stats.raw_records += page.records.len();
                    stats.new_records += state.accept(&page.records);
                    stats.has_more = page.has_more;
                    debug!(
                        sequence = packet.sequence(),
                        raw = page.records.len(),
                        has_more = page.has_more,
                        "decoded response"
                    );
                }
                DecodeOutcome::Throttled { code } => {
                    warn!(code, "site restricted the session");
                    return Err(CollectError::Throttled { code });
                }
                DecodeOutcome::OtherFailure { code, message } => {
                    return Err(CollectError::Remote { code, message });
                }
            }
        }

        Ok(stats)
    }

    /// Navigate, retrying transient failures with linear backoff.
    ///
    /// With `arm` set, capture is (re-)armed before every attempt so the
    /// packets of a failed attempt never leak into the next one.
    async fn navigate_with_retry(&mut self, url: &str, arm: bool) -> Result<()> {
        let retries = self.settings.limits.navigation_retries;
        let pattern = self.settings.site.capture_pattern.clone();
        let mut attempt = 0;

        loop {
            if arm {
                self.capture.begin(&pattern).await?;
            }

            match self.navigator.navigate(url).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < retries => {
                    attempt += 1;
                    warn!(
                        url,
                        attempt,
                        retries,
                        error = %e,
                        "navigation failed, retrying"
                    );
                    self.pacing.wait_scaled(category::RETRY, attempt).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Log what the page shows when the expected response never came.
    async fn report_blank_page(&self, query: &SearchQuery) {
        if let Ok(api_url) = self.navigator.build_api_url(query) {
            debug!(api_url = %api_url, "expected search request was not observed");
        }
        match self.driver.current_body().await {
            Ok(html) if looks_like_verification(&html) => {
                warn!("site served a verification page instead of results");
            }
            Ok(html) => debug!(bytes = html.len(), "no response captured for loaded page"),
            Err(e) => debug!(error = %e, "could not read page body"),
        }
    }
}

fn looks_like_verification(html: &str) -> bool {
    let lower = html.to_lowercase();
    VERIFICATION_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn secs(value: u64) -> Duration {
    Duration::from_secs(value)
}
