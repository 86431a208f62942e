#![allow(clippy::must_use_candidate)]

use crate::record::JobRecord;
use serde::{Deserialize, Serialize};

/// Post-collection narrowing of records.
///
/// Empty criteria match everything. Keywords match case-insensitively
/// against the job name and labels; cities and scales must match exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFilter {
    pub keywords: Vec<String>,
    pub cities: Vec<String>,
    pub scales: Vec<String>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    #[must_use]
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.cities.push(city.into());
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: impl Into<String>) -> Self {
        self.scales.push(scale.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.cities.is_empty() && self.scales.is_empty()
    }

    pub fn matches(&self, record: &JobRecord) -> bool {
        if !self.keywords.is_empty() {
            let text = format!("{} {}", record.job_name, record.job_labels.join(" ")).to_lowercase();
            if !self
                .keywords
                .iter()
                .any(|keyword| text.contains(&keyword.to_lowercase()))
            {
                return false;
            }
        }

        if !self.cities.is_empty() && !self.cities.contains(&record.city_name) {
            return false;
        }

        if !self.scales.is_empty() && !self.scales.contains(&record.brand_scale_name) {
            return false;
        }

        true
    }

    /// Records that match, in their original order.
    pub fn apply(&self, records: &[JobRecord]) -> Vec<JobRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}
