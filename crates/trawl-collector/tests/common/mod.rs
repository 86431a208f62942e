#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trawl_browser::{BrowserError, SessionDriver};
use trawl_collector::ScrollPrompt;
use trawl_core::{Payload, ResponsePacket};

/// Scripted stand-in for a browser session.
///
/// Each `intercept_await` pops the next scripted batch; once the script is
/// exhausted it behaves like a capture timeout.
#[derive(Default)]
pub struct FakeDriver {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    batches: VecDeque<Vec<ResponsePacket>>,
    navigation_failures: VecDeque<BrowserError>,
    navigations: Vec<String>,
    begins: Vec<String>,
    stops: usize,
    scrolls: usize,
    awaits: usize,
    closed: bool,
    selector_missing: bool,
    body: String,
    next_sequence: u64,
}

impl FakeDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue one batch holding a single JSON response.
    pub fn push_json(&self, body: Value) {
        self.push_texts(vec![body.to_string()]);
    }

    /// Queue one batch of raw text bodies, delivered in order.
    pub fn push_texts(&self, bodies: Vec<String>) {
        let mut state = self.state.lock().unwrap();
        let mut batch = Vec::new();
        for body in bodies {
            state.next_sequence += 1;
            batch.push(ResponsePacket::new(
                state.next_sequence,
                "https://www.zhipin.com/wapi/zpgeek/search/joblist.json",
                Payload::Text(body),
            ));
        }
        state.batches.push_back(batch);
    }

    /// Queue a batch of prebuilt packets, as delivered by the driver.
    pub fn push_packets(&self, packets: Vec<ResponsePacket>) {
        self.state.lock().unwrap().batches.push_back(packets);
    }

    /// Queue a capture that times out.
    pub fn push_timeout(&self) {
        self.state.lock().unwrap().batches.push_back(Vec::new());
    }

    pub fn fail_next_navigation(&self, error: BrowserError) {
        self.state
            .lock()
            .unwrap()
            .navigation_failures
            .push_back(error);
    }

    pub fn hide_result_list(&self) {
        self.state.lock().unwrap().selector_missing = true;
    }

    pub fn set_body(&self, body: &str) {
        self.state.lock().unwrap().body = body.to_string();
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn begins(&self) -> Vec<String> {
        self.state.lock().unwrap().begins.clone()
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    pub fn scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    pub fn awaits(&self) -> usize {
        self.state.lock().unwrap().awaits
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl SessionDriver for FakeDriver {
    async fn navigate(&self, url: &str) -> trawl_browser::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        match state.navigation_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn current_body(&self) -> trawl_browser::Result<String> {
        Ok(self.state.lock().unwrap().body.clone())
    }

    async fn scroll_to_bottom(&self) -> trawl_browser::Result<()> {
        self.state.lock().unwrap().scrolls += 1;
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        _selector: &str,
        timeout: Duration,
    ) -> trawl_browser::Result<bool> {
        let missing = self.state.lock().unwrap().selector_missing;
        if missing {
            tokio::time::sleep(timeout).await;
        }
        Ok(!missing)
    }

    async fn intercept_begin(&self, pattern: &str) -> trawl_browser::Result<()> {
        self.state.lock().unwrap().begins.push(pattern.to_string());
        Ok(())
    }

    async fn intercept_await(
        &self,
        timeout: Duration,
    ) -> trawl_browser::Result<Vec<ResponsePacket>> {
        let batch = {
            let mut state = self.state.lock().unwrap();
            state.awaits += 1;
            state.batches.pop_front().unwrap_or_default()
        };
        if batch.is_empty() {
            tokio::time::sleep(timeout).await;
        }
        Ok(batch)
    }

    async fn intercept_stop(&self) -> trawl_browser::Result<()> {
        self.state.lock().unwrap().stops += 1;
        Ok(())
    }

    async fn close(&self) -> trawl_browser::Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Operator that answers from a fixed script, then declines.
pub struct ScriptedPrompt {
    answers: VecDeque<bool>,
    asked: Arc<Mutex<Vec<(u32, usize)>>>,
}

impl ScriptedPrompt {
    pub fn new(answers: &[bool]) -> (Self, Arc<Mutex<Vec<(u32, usize)>>>) {
        let asked = Arc::new(Mutex::new(Vec::new()));
        let prompt = Self {
            answers: answers.iter().copied().collect(),
            asked: Arc::clone(&asked),
        };
        (prompt, asked)
    }
}

#[async_trait]
impl ScrollPrompt for ScriptedPrompt {
    async fn confirm(&mut self, round: u32, collected: usize) -> bool {
        self.asked.lock().unwrap().push((round, collected));
        self.answers.pop_front().unwrap_or(false)
    }
}

/// Raw API record with the fields the site always sends.
pub fn job(id: &str) -> Value {
    json!({
        "encryptJobId": id,
        "jobName": format!("Python 开发工程师 {id}"),
        "brandName": "示例科技",
        "cityName": "北京",
        "brandScaleName": "100-499人",
        "jobDegree": "本科",
        "jobExperience": "3-5年",
        "jobLabels": ["Python", "Django"]
    })
}

/// `count` distinct identifiers starting with `prefix`.
pub fn ids(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}-{i}")).collect()
}

/// Successful search response carrying `ids`.
pub fn job_page(ids: &[String], has_more: bool, total: u64) -> Value {
    json!({
        "code": 0,
        "message": "Success",
        "zpData": {
            "jobList": ids.iter().map(|id| job(id)).collect::<Vec<_>>(),
            "hasMore": has_more,
            "totalCount": total
        }
    })
}

pub fn failure(code: i64, message: &str) -> Value {
    json!({"code": code, "message": message})
}
