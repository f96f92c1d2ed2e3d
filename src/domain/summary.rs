//! Running counters and error bookkeeping for one batch run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::conversion::ConversionResult;
use super::outcome::FetchOutcome;

/// Aggregate counters, rebuilt on every invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub accessible: usize,
    pub inaccessible: usize,

    /// Stored items per category
    #[serde(default)]
    pub categories: BTreeMap<String, usize>,
}

impl BatchSummary {
    /// Create an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a conversion result (conversion-only batches)
    pub fn record_conversion(&mut self, result: &ConversionResult) {
        self.total += 1;

        if result.success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }

        match result.is_accessible {
            Some(true) => self.accessible += 1,
            Some(false) => self.inaccessible += 1,
            None => {}
        }
    }

    /// Count one item of a download run
    pub fn record_fetch(&mut self, outcome: &FetchOutcome) {
        self.total += 1;

        if outcome.success {
            self.successful += 1;
            if let Some(category) = &outcome.category {
                *self.categories.entry(category.clone()).or_insert(0) += 1;
            }
        } else {
            self.failed += 1;
        }
    }

    /// Count an item that never reached the fetcher
    pub fn record_skipped(&mut self) {
        self.total += 1;
        self.failed += 1;
    }

    /// Percentage of successful items (0.0 for an empty batch)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total as f64 * 100.0
    }
}

/// A recorded per-item failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub reference: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    pub error: String,

    pub timestamp: DateTime<Utc>,
}

impl ItemError {
    pub fn new(reference: impl Into<String>, identifier: Option<String>, error: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            identifier,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered list of item failures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorLog {
    entries: Vec<ItemError>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ItemError) {
        self.entries.push(error);
    }

    pub fn entries(&self) -> &[ItemError] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First `limit` distinct messages, plus how many errors they leave out
    pub fn abbreviated(&self, limit: usize) -> (Vec<&str>, usize) {
        let mut shown: Vec<&str> = Vec::new();
        let mut covered = 0;

        for entry in &self.entries {
            if shown.contains(&entry.error.as_str()) {
                covered += 1;
                continue;
            }
            if shown.len() == limit {
                continue;
            }
            shown.push(&entry.error);
            covered += 1;
        }

        (shown, self.entries.len() - covered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let mut summary = BatchSummary::new();
        assert_eq!(summary.success_rate(), 0.0);

        summary.record_fetch(&FetchOutcome::failed("boom", 3));
        summary.record_fetch(&FetchOutcome::stored(
            "/tmp/a.jpg".into(),
            "a.jpg".to_string(),
            "batom".to_string(),
            2048,
            "jpg".to_string(),
            1,
        ));

        assert_eq!(summary.total, 2);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.categories.get("batom"), Some(&1));
        assert!((summary.success_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_abbreviated_errors() {
        let mut log = ErrorLog::new();
        for msg in ["a", "b", "a", "c", "d", "e", "f", "g"] {
            log.push(ItemError::new("ref", None, msg));
        }

        let (shown, remainder) = log.abbreviated(5);
        assert_eq!(shown, vec!["a", "b", "c", "d", "e"]);
        // f and g are left out; the repeated "a" is covered by the first one
        assert_eq!(remainder, 2);
    }

    #[test]
    fn test_abbreviated_empty() {
        let log = ErrorLog::new();
        let (shown, remainder) = log.abbreviated(5);
        assert!(shown.is_empty());
        assert_eq!(remainder, 0);
    }
}
