//! Output tree persistence.
//!
//! Every document is written to a temp file in the destination directory
//! and renamed over the target, so readers only ever see complete files.
//! Writers hold an exclusive lock on `<output>/.drivecat.lock`.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use super::catalog::{CatalogDocument, CatalogLabels, CatalogStats};
use super::guide::render_usage_guide;
use super::metadata::BatchMetadata;

pub const METADATA_FILE: &str = "metadata.json";
pub const CATALOG_FILE: &str = "catalog.json";
pub const GUIDE_FILE: &str = "usage_guide.md";
pub const LOCK_FILE: &str = ".drivecat.lock";

/// Write `contents` to `path` via a sibling temp file and rename
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    temp.write_all(contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    temp.flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    write_atomic(path, json.as_bytes())
}

/// Read a JSON document, `None` if the file does not exist
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    serde_json::from_str(&content)
        .map(Some)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Exclusive writer lock on an output tree
#[derive(Debug)]
pub struct OutputLock {
    _file: File,
}

/// The categorized output directory
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_FILE)
    }

    pub fn guide_path(&self) -> PathBuf {
        self.root.join(GUIDE_FILE)
    }

    /// Create the root and one directory per category
    pub fn ensure_layout(&self, categories: &[&str]) -> Result<()> {
        for category in categories {
            let dir = self.root.join(category);
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create directory: {}", self.root.display()))
    }

    /// Block until this process is the only writer
    pub fn lock(&self) -> Result<OutputLock> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create directory: {}", self.root.display()))?;

        let path = self.root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        file.lock_exclusive()
            .with_context(|| format!("Failed to acquire lock on {}", path.display()))?;

        // Lock is released when the file is dropped
        Ok(OutputLock { _file: file })
    }

    pub fn load_metadata(&self) -> Result<Option<BatchMetadata>> {
        read_json(&self.metadata_path())
    }

    pub fn load_catalog(&self) -> Result<Option<CatalogDocument>> {
        read_json(&self.catalog_path())
    }

    /// Rewrite metadata, catalog and usage guide from one batch record.
    ///
    /// Callers hold the [`OutputLock`].
    pub fn publish(
        &self,
        metadata: &BatchMetadata,
        labels: &CatalogLabels<'_>,
    ) -> Result<CatalogDocument> {
        let catalog = CatalogDocument::build(metadata, labels);
        let stats = CatalogStats::compute(metadata);

        write_json(&self.metadata_path(), metadata)?;
        write_json(&self.catalog_path(), &catalog)?;
        let guide = render_usage_guide(&catalog, &stats, &metadata.web_prefix)
            .context("Failed to render usage guide")?;
        write_atomic(&self.guide_path(), guide.as_bytes())?;

        debug!(root = %self.root.display(), products = catalog.len(), "Catalog outputs written");
        Ok(catalog)
    }
}
