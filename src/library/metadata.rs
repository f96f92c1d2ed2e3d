//! The per-run batch record (`metadata.json`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{BatchSummary, ErrorLog, FetchOutcome, ItemError};

use super::catalog::CatalogEntry;
use super::dedup::DuplicateCluster;

/// Durable description of one download run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub run_id: Uuid,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// URL prefix the output tree is served under
    pub web_prefix: String,

    pub summary: BatchSummary,

    /// Stored files in input order
    #[serde(default)]
    pub entries: Vec<CatalogEntry>,

    #[serde(default)]
    pub errors: ErrorLog,

    /// Set by the dedup pass
    #[serde(default)]
    pub duplicates: Vec<DuplicateCluster>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduplicated_at: Option<DateTime<Utc>>,
}

impl BatchMetadata {
    pub fn new(web_prefix: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            web_prefix: web_prefix.into(),
            summary: BatchSummary::new(),
            entries: Vec::new(),
            errors: ErrorLog::new(),
            duplicates: Vec::new(),
            deduplicated_at: None,
        }
    }

    /// Record a stored file
    pub fn record_stored(&mut self, entry: CatalogEntry, outcome: &FetchOutcome) {
        self.summary.record_fetch(outcome);
        self.entries.push(entry);
    }

    /// Record a fetch that came back unsuccessful
    pub fn record_fetch_failure(
        &mut self,
        reference: &str,
        identifier: Option<String>,
        outcome: &FetchOutcome,
    ) {
        self.summary.record_fetch(outcome);
        let error = outcome.error.clone().unwrap_or_else(|| "Unknown error".to_string());
        self.errors.push(ItemError::new(reference, identifier, error));
    }

    /// Record an item that never reached the fetcher
    pub fn record_failure(
        &mut self,
        reference: &str,
        identifier: Option<String>,
        error: impl Into<String>,
    ) {
        self.summary.record_skipped();
        self.errors.push(ItemError::new(reference, identifier, error));
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_are_logged() {
        let mut metadata = BatchMetadata::new("/img");
        metadata.record_failure("not a link", None, "Could not extract");
        metadata.record_fetch_failure(
            "https://drive.google.com/file/d/abc/view",
            Some("abc".to_string()),
            &FetchOutcome::failed("HTTP status 404", 1),
        );

        assert_eq!(metadata.summary.total, 2);
        assert_eq!(metadata.summary.failed, 2);
        assert_eq!(metadata.errors.len(), 2);
        assert_eq!(
            metadata.errors.entries()[1].identifier.as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_serde_round_trip_keeps_optional_fields_out() {
        let mut metadata = BatchMetadata::new("/img");
        metadata.finish();

        let json = serde_json::to_string(&metadata).unwrap();
        assert!(!json.contains("deduplicated_at"));

        let parsed: BatchMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, metadata);
    }
}
