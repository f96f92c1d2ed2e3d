//! CSV and JSON reports for conversion batches.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::BatchReport;
use crate::domain::{BatchSummary, ConversionResult};

use super::store::{write_atomic, write_json};

/// One CSV row
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    original_url: &'a str,
    file_id: &'a str,
    direct_url: &'a str,
    format: &'a str,
    success: bool,
    error: &'a str,
    is_accessible: String,
}

impl<'a> From<&'a ConversionResult> for CsvRow<'a> {
    fn from(result: &'a ConversionResult) -> Self {
        Self {
            original_url: &result.reference,
            file_id: result.identifier.as_ref().map(|id| id.as_str()).unwrap_or(""),
            direct_url: result.direct_url.as_deref().unwrap_or(""),
            format: result.representation.map(|r| r.name()).unwrap_or(""),
            success: result.success,
            error: result.error.as_deref().unwrap_or(""),
            is_accessible: result
                .is_accessible
                .map(|a| a.to_string())
                .unwrap_or_default(),
        }
    }
}

/// JSON report layout
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    successful: Vec<&'a ConversionResult>,
    failed: Vec<&'a ConversionResult>,
    summary: &'a BatchSummary,
}

/// `<dir>/<stem>_converted.csv` and `.json` next to the input file
pub fn report_paths(input: &Path) -> (PathBuf, PathBuf) {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "links".to_string());
    let dir = input.parent().unwrap_or(Path::new(""));

    (
        dir.join(format!("{}_converted.csv", stem)),
        dir.join(format!("{}_converted.json", stem)),
    )
}

/// Render results as CSV
pub fn render_csv(results: &[ConversionResult]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for result in results {
        writer
            .serialize(CsvRow::from(result))
            .context("Failed to serialize CSV row")?;
    }
    writer.into_inner().context("Failed to flush CSV")
}

/// Write the CSV report atomically
pub fn write_csv_report(path: &Path, results: &[ConversionResult]) -> Result<()> {
    write_atomic(path, &render_csv(results)?)
}

/// Write the JSON report atomically
pub fn write_json_report(path: &Path, report: &BatchReport) -> Result<()> {
    let json = JsonReport {
        successful: report.successful().collect(),
        failed: report.failed().collect(),
        summary: &report.summary,
    };
    write_json(path, &json)
}

/// Write both reports next to `input`, returning their paths
pub fn write_reports(input: &Path, report: &BatchReport) -> Result<(PathBuf, PathBuf)> {
    let (csv_path, json_path) = report_paths(input);
    write_csv_report(&csv_path, &report.results)?;
    write_json_report(&json_path, report)?;
    Ok((csv_path, json_path))
}
