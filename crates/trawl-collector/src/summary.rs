//! Aggregate statistics over collected records.

use crate::orchestrator::{CollectionOutcome, RunStatus};
use crate::record::JobRecord;
use crate::FailureKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Label used when a record leaves a grouped field empty.
pub const UNKNOWN: &str = "unknown";

/// One value of a distribution and how many records carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub value: String,
    pub count: usize,
}

/// How a run went, recorded next to its statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub mode: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub attempts: u32,
    pub packets_processed: usize,
    pub total_count: Option<u64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Distributions of the collected records by city, company scale, degree
/// and experience, each sorted by count (highest first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub total_jobs: usize,
    pub city_distribution: Vec<Bucket>,
    pub scale_distribution: Vec<Bucket>,
    pub degree_distribution: Vec<Bucket>,
    pub experience_distribution: Vec<Bucket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<RunInfo>,
}

impl CollectionSummary {
    #[must_use]
    pub fn from_records(records: &[JobRecord]) -> Self {
        Self {
            total_jobs: records.len(),
            city_distribution: distribution(records, |r| &r.city_name),
            scale_distribution: distribution(records, |r| &r.brand_scale_name),
            degree_distribution: distribution(records, |r| &r.job_degree),
            experience_distribution: distribution(records, |r| &r.job_experience),
            run: None,
        }
    }

    /// Summary of a finished run, including its status.
    #[must_use]
    pub fn from_outcome(outcome: &CollectionOutcome) -> Self {
        let (status, failure, reason) = match &outcome.status {
            RunStatus::Terminated => ("terminated", None, None),
            RunStatus::Failed { kind, message } => ("failed", Some(*kind), Some(message.clone())),
        };

        Self {
            run: Some(RunInfo {
                run_id: outcome.run_id,
                mode: outcome.mode.label().to_string(),
                status: status.to_string(),
                failure,
                reason,
                attempts: outcome.attempts,
                packets_processed: outcome.packets_processed,
                total_count: outcome.total_count,
                started_at: outcome.started_at,
                finished_at: outcome.finished_at,
            }),
            ..Self::from_records(&outcome.records)
        }
    }
}

fn distribution<F>(records: &[JobRecord], key: F) -> Vec<Bucket>
where
    F: Fn(&JobRecord) -> &String,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        let value = key(record).trim();
        let value = if value.is_empty() { UNKNOWN } else { value };
        *counts.entry(value).or_default() += 1;
    }

    let mut buckets: Vec<Bucket> = counts
        .into_iter()
        .map(|(value, count)| Bucket {
            value: value.to_string(),
            count,
        })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    buckets
}
