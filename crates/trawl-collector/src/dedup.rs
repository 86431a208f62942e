//! Session-wide record deduplication.

use crate::record::JobRecord;
use serde_json::Value;
use std::collections::HashSet;
use tracing::trace;

/// Remembers every identifier accepted during one collection run.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    id_field: String,
    seen: HashSet<String>,
}

impl Deduplicator {
    /// Create a deduplicator keyed on `id_field` of the raw records.
    #[must_use]
    pub fn new(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            seen: HashSet::new(),
        }
    }

    /// Keep only records whose identifier has not been seen, in input order.
    ///
    /// Records without a usable identifier are dropped, as are repeats
    /// within the same batch.
    pub fn accept(&mut self, raw_records: &[Value]) -> Vec<JobRecord> {
        let mut accepted = Vec::new();

        for raw in raw_records {
            let Some(id) = raw.get(&self.id_field).and_then(record_id) else {
                trace!(field = %self.id_field, "dropping record without identifier");
                continue;
            };

            if self.seen.insert(id.clone()) {
                accepted.push(JobRecord::from_raw(raw, id));
            }
        }

        accepted
    }

    /// Whether an identifier has already been accepted.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Number of distinct identifiers accepted so far.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

fn record_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn batch() -> Vec<Value> {
        vec![
            json!({"encryptJobId": "a", "jobName": "Rust"}),
            json!({"encryptJobId": "b", "jobName": "Go"}),
            json!({"encryptJobId": 17, "jobName": "Zig"}),
        ]
    }

    #[test]
    fn test_same_batch_twice_is_empty_second_time() {
        let mut dedup = Deduplicator::new("encryptJobId");
        assert_eq!(dedup.accept(&batch()).len(), 3);
        assert!(dedup.accept(&batch()).is_empty());
        assert_eq!(dedup.seen_count(), 3);
    }

    #[test]
    fn test_preserves_order_and_drops_in_batch_repeats() {
        let mut dedup = Deduplicator::new("encryptJobId");
        let records = dedup.accept(&[
            json!({"encryptJobId": "x", "jobName": "first"}),
            json!({"encryptJobId": "y"}),
            json!({"encryptJobId": "x", "jobName": "again"}),
        ]);

        let ids: Vec<_> = records.iter().map(|r| r.job_id.as_str()).collect();
        assert_eq!(ids, ["x", "y"]);
        assert_eq!(records[0].job_name, "first");
    }

    #[test]
    fn test_drops_records_without_usable_id() {
        let mut dedup = Deduplicator::new("encryptJobId");
        let records = dedup.accept(&[
            json!({"jobName": "no id"}),
            json!({"encryptJobId": "", "jobName": "empty"}),
            json!({"encryptJobId": null}),
            json!({"encryptJobId": ["a"]}),
            json!("not an object"),
            json!({"encryptJobId": "ok"}),
        ]);

        assert_eq!(records.len(), 1);
        assert!(dedup.contains("ok"));
        assert!(!dedup.contains(""));
    }

    #[test]
    fn test_numeric_ids_are_stringified() {
        let mut dedup = Deduplicator::new("id");
        let records = dedup.accept(&[json!({"id": 42})]);
        assert_eq!(records[0].job_id, "42");
        assert!(dedup.accept(&[json!({"id": "42"})]).is_empty());
    }
}
