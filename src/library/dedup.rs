//! Content-hash deduplication over a finished download run.
//!
//! This is a separate pass from `fetch`: it reads the batch record, hashes
//! every stored file, and writes fingerprints, dimensions and duplicate
//! clusters back. Running it twice yields the same record.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{info, instrument, warn};

use crate::core::sniff::{read_dimensions, Dimensions};

use super::catalog::{CatalogEntry, CatalogLabels};
use super::store::OutputStore;

/// Read size for hashing
const CHUNK_SIZE: usize = 8 * 1024;

/// Header bytes inspected for image dimensions
const HEADER_BYTES: usize = 256 * 1024;

/// Files sharing one fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCluster {
    pub fingerprint: String,
    pub count: usize,
    /// Web paths of the clustered files, in first-appearance order
    pub files: Vec<String>,
}

/// Outcome of a dedup pass
#[derive(Debug, Clone, Default)]
pub struct DedupReport {
    /// Files hashed
    pub analyzed: usize,
    /// Entries whose file was not found
    pub missing: Vec<String>,
    pub clusters: Vec<DuplicateCluster>,
}

impl DedupReport {
    /// Files that could be removed without losing content
    pub fn redundant_files(&self) -> usize {
        self.clusters.iter().map(|c| c.count - 1).sum()
    }
}

/// SHA-256 of a file's contents as lower-case hex
pub async fn fingerprint(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file
            .read(&mut buf)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Read image dimensions from the leading bytes of a file
pub async fn dimensions(path: &Path) -> Result<Option<Dimensions>> {
    let file = File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut header = Vec::with_capacity(CHUNK_SIZE);
    file.take(HEADER_BYTES as u64)
        .read_to_end(&mut header)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(read_dimensions(&header))
}

/// Clusters of two or more entries with the same fingerprint
pub fn group_by_fingerprint(entries: &[CatalogEntry]) -> Vec<DuplicateCluster> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&CatalogEntry>> = HashMap::new();

    for entry in entries {
        let Some(fp) = entry.fingerprint.as_deref() else {
            continue;
        };
        let group = groups.entry(fp).or_default();
        if group.is_empty() {
            order.push(fp);
        }
        group.push(entry);
    }

    order
        .into_iter()
        .filter_map(|fp| {
            let group = &groups[fp];
            (group.len() > 1).then(|| DuplicateCluster {
                fingerprint: fp.to_string(),
                count: group.len(),
                files: group.iter().map(|e| e.web_path.clone()).collect(),
            })
        })
        .collect()
}

/// Fingerprint every stored file of the last run and rewrite the catalog
#[instrument(skip(store, labels), fields(output = %store.root().display()))]
pub async fn run_dedup(store: &OutputStore, labels: &CatalogLabels<'_>) -> Result<DedupReport> {
    let _lock = store.lock()?;

    let mut metadata = store
        .load_metadata()?
        .with_context(|| {
            format!(
                "No batch record in {}; run `fetch` first",
                store.root().display()
            )
        })?;

    let mut report = DedupReport::default();

    for entry in &mut metadata.entries {
        let path = store.root().join(entry.relative_path());

        if !path.exists() {
            warn!(file = %path.display(), "Stored file is missing, skipping");
            entry.fingerprint = None;
            report.missing.push(entry.web_path.clone());
            continue;
        }

        entry.fingerprint = Some(fingerprint(&path).await?);
        entry.dimensions = dimensions(&path).await?;
        report.analyzed += 1;
    }

    report.clusters = group_by_fingerprint(&metadata.entries);
    for cluster in &report.clusters {
        info!(
            fingerprint = %cluster.fingerprint,
            count = cluster.count,
            "Duplicate cluster"
        );
    }

    metadata.duplicates = report.clusters.clone();
    metadata.deduplicated_at = Some(Utc::now());
    store.publish(&metadata, labels)?;

    info!(
        analyzed = report.analyzed,
        missing = report.missing.len(),
        clusters = report.clusters.len(),
        "Dedup pass finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceIdentifier;
    use tempfile::TempDir;

    fn entry(id: &str, fingerprint: Option<&str>) -> CatalogEntry {
        CatalogEntry {
            identifier: ResourceIdentifier::parse(id).unwrap(),
            reference: id.to_string(),
            filename: format!("cosmetic_{}.jpg", id),
            category: "outros".to_string(),
            web_path: format!("/img/outros/cosmetic_{}.jpg", id),
            byte_size: 2048,
            extension: "jpg".to_string(),
            fingerprint: fingerprint.map(str::to_string),
            dimensions: None,
            retrieved_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_fingerprint_matches_sha256() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.bin");
        std::fs::write(&path, b"abc").unwrap();

        assert_eq!(
            fingerprint(&path).await.unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_fingerprint_spans_chunks() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.bin");
        let b = temp.path().join("b.bin");
        let mut data = vec![1u8; CHUNK_SIZE * 3 + 17];
        std::fs::write(&a, &data).unwrap();
        *data.last_mut().unwrap() = 2;
        std::fs::write(&b, &data).unwrap();

        assert_ne!(fingerprint(&a).await.unwrap(), fingerprint(&b).await.unwrap());
    }

    #[test]
    fn test_grouping_keeps_first_appearance_order() {
        let entries = vec![
            entry("a", Some("f2")),
            entry("b", Some("f1")),
            entry("c", Some("f2")),
            entry("d", None),
            entry("e", Some("f1")),
            entry("f", Some("f3")),
        ];

        let clusters = group_by_fingerprint(&entries);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].fingerprint, "f2");
        assert_eq!(
            clusters[0].files,
            vec!["/img/outros/cosmetic_a.jpg", "/img/outros/cosmetic_c.jpg"]
        );
        assert_eq!(clusters[1].fingerprint, "f1");
        assert_eq!(clusters[1].count, 2);
    }

    #[test]
    fn test_redundant_files() {
        let report = DedupReport {
            analyzed: 5,
            missing: vec![],
            clusters: vec![
                DuplicateCluster {
                    fingerprint: "x".into(),
                    count: 3,
                    files: vec![],
                },
                DuplicateCluster {
                    fingerprint: "y".into(),
                    count: 2,
                    files: vec![],
                },
            ],
        };
        assert_eq!(report.redundant_files(), 3);
    }
}
