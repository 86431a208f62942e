//! Result persistence.
//!
//! The orchestrator never writes results itself; callers hand the outcome of
//! a run to a [`PersistenceSink`].

use crate::error::Result;
use crate::record::JobRecord;
use crate::summary::CollectionSummary;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use trawl_core::{Payload, ResponsePacket};

/// File the latest raw response is written to.
pub const RAW_RESPONSE_FILE: &str = "last_search_response.json";

/// Destination for collected records.
pub trait PersistenceSink: Send + Sync {
    /// Store the records and their summary, returning where they went.
    fn save(&self, records: &[JobRecord], summary: &CollectionSummary) -> Result<PathBuf>;
}

/// On-disk shape of a results file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultDocument {
    pub total_jobs: usize,
    /// Unix seconds at save time
    pub timestamp: i64,
    pub jobs: Vec<JobRecord>,
    pub summary: CollectionSummary,
}

/// Writes each run to `jobs_data_<unix_ts>.json` in a directory.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the records back from a results file.
    ///
    /// Accepts both the full document and a bare array of records.
    pub fn load(path: &Path) -> Result<Vec<JobRecord>> {
        let contents = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&contents)?;

        let jobs = match value {
            Value::Object(mut object) => object.remove("jobs").unwrap_or(Value::Array(Vec::new())),
            other => other,
        };
        Ok(serde_json::from_value(jobs)?)
    }

    /// Write one captured response body to [`RAW_RESPONSE_FILE`].
    ///
    /// JSON bodies are pretty-printed; anything else is written as received.
    pub fn save_raw(&self, packet: &ResponsePacket) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let text = match packet.payload() {
            Payload::Text(text) => text.clone(),
            Payload::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        };
        let contents = match serde_json::from_str::<Value>(&text) {
            Ok(value) => serde_json::to_string_pretty(&value)?,
            Err(_) => text,
        };

        let path = self.dir.join(RAW_RESPONSE_FILE);
        std::fs::write(&path, contents)?;
        debug!(path = %path.display(), sequence = packet.sequence(), "saved raw response");
        Ok(path)
    }

    /// First free file name for `timestamp`.
    fn target_path(&self, timestamp: i64) -> PathBuf {
        let path = self.dir.join(format!("jobs_data_{timestamp}.json"));
        if !path.exists() {
            return path;
        }
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        self.dir
            .join(format!("jobs_data_{timestamp}_{}.json", &suffix[..8]))
    }
}

impl PersistenceSink for JsonFileSink {
    fn save(&self, records: &[JobRecord], summary: &CollectionSummary) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let timestamp = chrono::Utc::now().timestamp();
        let document = ResultDocument {
            total_jobs: records.len(),
            timestamp,
            jobs: records.to_vec(),
            summary: summary.clone(),
        };

        let path = self.target_path(timestamp);
        std::fs::write(&path, serde_json::to_string_pretty(&document)?)?;

        info!(path = %path.display(), records = records.len(), "saved results");
        Ok(path)
    }
}
