//! Batch conversion of share links into direct URLs.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::domain::{
    BatchSummary, ConversionResult, ErrorLog, Extractor, Formatter, ItemError, Representation,
    ThumbnailSize,
};

use super::probe::Prober;

/// Read references from a text file: one per line, blank lines and `#` comments skipped
pub async fn load_references(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    Ok(parse_references(&content))
}

/// Split text into references
pub fn parse_references(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Ordered results of a conversion batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// One result per input reference, in input order
    pub results: Vec<ConversionResult>,

    /// Aggregate counters
    pub summary: BatchSummary,

    /// Failed items
    pub errors: ErrorLog,
}

impl BatchReport {
    pub fn successful(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| r.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| !r.success)
    }

    fn record(&mut self, result: ConversionResult) {
        self.summary.record_conversion(&result);
        if let Some(error) = &result.error {
            self.errors.push(ItemError::new(
                result.reference.clone(),
                result.identifier.as_ref().map(|id| id.to_string()),
                error.clone(),
            ));
        }
        self.results.push(result);
    }
}

/// Converts references with partial-failure isolation
pub struct Converter {
    extractor: Extractor,
    formatter: Formatter,
    prober: Option<Prober>,
}

impl Converter {
    pub fn new(extractor: Extractor, formatter: Formatter) -> Self {
        Self {
            extractor,
            formatter,
            prober: None,
        }
    }

    /// Probe every converted URL with `prober`
    pub fn with_prober(mut self, prober: Prober) -> Self {
        self.prober = Some(prober);
        self
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Convert one reference without probing
    pub fn convert_one(
        &self,
        reference: &str,
        representation: Representation,
        size: ThumbnailSize,
    ) -> ConversionResult {
        match self.extractor.extract(reference) {
            Ok(identifier) => {
                let url = self.formatter.format(&identifier, representation, size);
                ConversionResult::converted(reference, identifier, url, representation)
            }
            Err(e) => {
                debug!(reference, error = %e, "Extraction failed");
                ConversionResult::failed(reference, &e)
            }
        }
    }

    /// Convert one reference, probing the result when a prober is set
    pub async fn convert(
        &self,
        reference: &str,
        representation: Representation,
        size: ThumbnailSize,
    ) -> ConversionResult {
        let result = self.convert_one(reference, representation, size);

        match (&self.prober, &result.direct_url) {
            (Some(prober), Some(url)) => {
                let accessible = prober.probe(url).await;
                result.with_accessibility(accessible)
            }
            _ => result,
        }
    }

    /// Convert a batch in input order; per-item failures never abort it
    #[instrument(skip_all, fields(count = references.len(), representation = %representation))]
    pub async fn convert_batch(
        &self,
        references: &[String],
        representation: Representation,
        size: ThumbnailSize,
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for (idx, reference) in references.iter().enumerate() {
            debug!(item = idx + 1, reference = %reference, "Converting");
            report.record(self.convert(reference, representation, size).await);
        }

        info!(
            total = report.summary.total,
            successful = report.summary.successful,
            failed = report.summary.failed,
            "Conversion batch finished"
        );

        report
    }
}
