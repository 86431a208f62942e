//! Network response capture over the DevTools protocol.
//!
//! A response is only readable once `Network.loadingFinished` fires for its
//! request, so matching `responseReceived` events are parked until then and
//! the body is fetched with `Network.getResponseBody`. The two events arrive
//! on separate streams, so either may be seen first.

use crate::error::{BrowserError, Result};
use base64::Engine as _;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventResponseReceived,
    GetResponseBodyParams, RequestId,
};
use chromiumoxide::Page;
use futures_util::{Stream, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use trawl_core::{Payload, ResponsePacket};

/// Finished request ids remembered while their response event is outstanding.
const EARLY_FINISH_CAPACITY: usize = 128;

/// A running capture for one URL pattern.
///
/// Dropping it stops the listener task.
pub(crate) struct Interceptor {
    pattern: String,
    task: JoinHandle<()>,
    packets: mpsc::UnboundedReceiver<ResponsePacket>,
}

impl Interceptor {
    /// Subscribe to network events on `page` and start matching `pattern`.
    pub(crate) async fn start(page: &Page, pattern: &str, sequence: Arc<AtomicU64>) -> Result<Self> {
        page.execute(EnableParams::default())
            .await
            .map_err(|e| BrowserError::Intercept(format!("enable network domain: {e}")))?;

        let responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| BrowserError::Intercept(format!("subscribe responseReceived: {e}")))?
            .map(|event| (event.request_id.inner().clone(), event.response.url.clone()));
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(|e| BrowserError::Intercept(format!("subscribe loadingFinished: {e}")))?
            .map(|event| event.request_id.inner().clone());
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(|e| BrowserError::Intercept(format!("subscribe loadingFailed: {e}")))?
            .map(|event| event.request_id.inner().clone());

        let (tx, packets) = mpsc::unbounded_channel();
        let page = page.clone();
        let fetch_body = move |request_id: String| {
            let page = page.clone();
            async move {
                page.execute(GetResponseBodyParams::new(RequestId::new(request_id)))
                    .await
                    .map(|body| decode_body(&body.result.body, body.result.base64_encoded))
                    .map_err(|e| e.to_string())
            }
        };

        let tracker = RequestTracker::new(pattern);
        let task = tokio::spawn(listen(
            responses, finished, failed, tracker, fetch_body, tx, sequence,
        ));

        Ok(Self {
            pattern: pattern.to_string(),
            task,
            packets,
        })
    }

    pub(crate) fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Wait for the first packet, then drain whatever else has already arrived.
    pub(crate) async fn next_batch(&mut self, timeout: Duration) -> Result<Vec<ResponsePacket>> {
        let first = match tokio::time::timeout(timeout, self.packets.recv()).await {
            Err(_) => return Ok(Vec::new()),
            Ok(None) => {
                return Err(BrowserError::Intercept(
                    "network listener stopped unexpectedly".to_string(),
                ))
            }
            Ok(Some(packet)) => packet,
        };

        let mut batch = vec![first];
        while let Ok(packet) = self.packets.try_recv() {
            batch.push(packet);
        }
        Ok(batch)
    }
}

impl Drop for Interceptor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Pairs response and completion events of matching requests, in either order.
#[derive(Debug)]
struct RequestTracker {
    pattern: String,
    /// request id -> URL of matched responses whose body is not ready yet
    pending: HashMap<String, String>,
    /// requests that finished before their response event was seen
    finished_early: VecDeque<String>,
}

impl RequestTracker {
    fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            pending: HashMap::new(),
            finished_early: VecDeque::new(),
        }
    }

    /// Returns the request when its body can be fetched now.
    fn on_response(&mut self, request_id: String, url: String) -> Option<(String, String)> {
        if !url.contains(&self.pattern) {
            return None;
        }

        if let Some(pos) = self.finished_early.iter().position(|id| *id == request_id) {
            self.finished_early.remove(pos);
            return Some((request_id, url));
        }

        trace!(url = %url, "matched response, waiting for body");
        self.pending.insert(request_id, url);
        None
    }

    /// Returns the request when it was a parked match.
    fn on_finished(&mut self, request_id: String) -> Option<(String, String)> {
        if let Some(url) = self.pending.remove(&request_id) {
            return Some((request_id, url));
        }

        if self.finished_early.len() == EARLY_FINISH_CAPACITY {
            self.finished_early.pop_front();
        }
        self.finished_early.push_back(request_id);
        None
    }

    fn on_failed(&mut self, request_id: &str) {
        if let Some(url) = self.pending.remove(request_id) {
            debug!(url = %url, "matched request failed before its body loaded");
        }
        self.finished_early.retain(|id| id != request_id);
    }
}

/// Listener loop: pairs events, fetches bodies and emits numbered packets.
///
/// Runs until every event stream ends or the receiver is dropped.
async fn listen<R, F, L, B, Fut>(
    mut responses: R,
    mut finished: F,
    mut failed: L,
    mut tracker: RequestTracker,
    mut fetch_body: B,
    tx: mpsc::UnboundedSender<ResponsePacket>,
    sequence: Arc<AtomicU64>,
) where
    R: Stream<Item = (String, String)> + Unpin,
    F: Stream<Item = String> + Unpin,
    L: Stream<Item = String> + Unpin,
    B: FnMut(String) -> Fut,
    Fut: Future<Output = std::result::Result<Payload, String>>,
{
    loop {
        // Response events first, so a completion never overtakes its response
        let ready = tokio::select! {
            biased;
            Some((request_id, url)) = responses.next() => tracker.on_response(request_id, url),
            Some(request_id) = failed.next() => {
                tracker.on_failed(&request_id);
                None
            }
            Some(request_id) = finished.next() => tracker.on_finished(request_id),
            else => break,
        };

        let Some((request_id, url)) = ready else {
            continue;
        };

        let payload = match fetch_body(request_id).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(url = %url, error = %e, "failed to read captured response body");
                continue;
            }
        };

        let seq = sequence.fetch_add(1, Ordering::SeqCst);
        debug!(url = %url, sequence = seq, bytes = payload.len(), "captured response");

        if tx.send(ResponsePacket::new(seq, url, payload)).is_err() {
            break;
        }
    }
}

/// Bodies arrive either as text or base64; undecodable base64 is kept as text.
fn decode_body(body: &str, base64_encoded: bool) -> Payload {
    if base64_encoded {
        match base64::engine::general_purpose::STANDARD.decode(body) {
            Ok(bytes) => return Payload::Bytes(bytes),
            Err(e) => warn!(error = %e, "response body flagged base64 but did not decode"),
        }
    }
    Payload::Text(body.to_string())
}
