//! Download run orchestration.
//!
//! Coordinates conversion, retrieval, categorization and the final catalog
//! write. Items are processed one at a time in input order with a fixed
//! pause between downloads.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::adapters::Transport;
use crate::config::ResolvedConfig;
use crate::domain::{
    Extractor, FetchOutcome, Formatter, Representation, ResourceIdentifier, ThumbnailSize,
};
use crate::library::{BatchMetadata, CatalogEntry, CatalogLabels, OutputStore};

use super::convert::Converter;
use super::fetcher::{FetchOptions, Fetcher};

/// Main download orchestrator
pub struct Orchestrator {
    converter: Converter,
    fetcher: Fetcher,
    store: OutputStore,
    item_delay: Duration,
    web_prefix: String,
    catalog_name: String,
    catalog_description: String,
    display_prefix: String,
}

impl Orchestrator {
    /// Wire every component from the resolved configuration
    pub fn new(config: &ResolvedConfig, transport: Arc<dyn Transport>) -> Self {
        let converter = Converter::new(Extractor::new(), Formatter::new(config.templates.clone()));

        let fetcher = Fetcher::new(
            transport,
            FetchOptions {
                output_dir: config.output.clone(),
                file_prefix: config.fetch.file_prefix.clone(),
                default_extension: config.fetch.default_extension.clone(),
                min_bytes: config.fetch.min_bytes,
                retry: config.retry.clone(),
                categorizer: config.categories.categorizer(),
            },
        );

        Self {
            converter,
            fetcher,
            store: OutputStore::new(config.output.clone()),
            item_delay: config.fetch.item_delay(),
            web_prefix: config.web_prefix.trim_end_matches('/').to_string(),
            catalog_name: config.catalog.name.clone(),
            catalog_description: config.catalog.description.clone(),
            display_prefix: config.catalog.display_prefix.clone(),
        }
    }

    /// Override the pause between downloads
    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    pub fn labels(&self) -> CatalogLabels<'_> {
        CatalogLabels {
            name: &self.catalog_name,
            description: &self.catalog_description,
            display_prefix: &self.display_prefix,
        }
    }

    /// Fetch every reference and persist the catalog outputs.
    ///
    /// Per-item failures are recorded and the run continues; storage
    /// failures abort it.
    #[instrument(skip(self, references), fields(count = references.len(), output = %self.store.root().display()))]
    pub async fn run(&self, references: &[String]) -> Result<BatchMetadata> {
        let _lock = self.store.lock()?;

        let categories = self.fetcher.options().categorizer.labels();
        self.store.ensure_layout(&categories)?;

        let mut metadata = BatchMetadata::new(self.web_prefix.clone());
        info!(run_id = %metadata.run_id, "Starting download run");

        let mut downloads = 0usize;

        for (idx, reference) in references.iter().enumerate() {
            info!(item = idx + 1, total = references.len(), "Processing");

            let converted =
                self.converter
                    .convert_one(reference, Representation::Download, ThumbnailSize::default());

            let (Some(identifier), Some(url)) = (converted.identifier, converted.direct_url) else {
                let error = converted
                    .error
                    .unwrap_or_else(|| "Conversion failed".to_string());
                warn!(reference, %error, "Skipping item");
                metadata.record_failure(reference, None, error);
                continue;
            };

            // Pause only between downloads
            if downloads > 0 && !self.item_delay.is_zero() {
                tokio::time::sleep(self.item_delay).await;
            }
            downloads += 1;

            self.download_item(reference, &identifier, &url, &mut metadata)
                .await
                .with_context(|| format!("Run aborted at item {} ({})", idx + 1, reference))?;
        }

        metadata.finish();
        self.store.publish(&metadata, &self.labels())?;

        info!(
            total = metadata.summary.total,
            successful = metadata.summary.successful,
            failed = metadata.summary.failed,
            "Download run finished"
        );

        Ok(metadata)
    }

    async fn download_item(
        &self,
        reference: &str,
        identifier: &ResourceIdentifier,
        url: &str,
        metadata: &mut BatchMetadata,
    ) -> Result<()> {
        let outcome = self.fetcher.fetch(url, identifier).await?;

        match stored_entry(reference, identifier, &outcome, &self.web_prefix) {
            Some(entry) => metadata.record_stored(entry, &outcome),
            None => {
                error!(reference, error = outcome.error.as_deref().unwrap_or_default(), "Download failed");
                metadata.record_fetch_failure(reference, Some(identifier.to_string()), &outcome);
            }
        }

        Ok(())
    }
}

fn stored_entry(
    reference: &str,
    identifier: &ResourceIdentifier,
    outcome: &FetchOutcome,
    web_prefix: &str,
) -> Option<CatalogEntry> {
    if !outcome.success {
        return None;
    }

    let filename = outcome.filename.clone()?;
    let category = outcome.category.clone()?;

    Some(CatalogEntry {
        identifier: identifier.clone(),
        reference: reference.to_string(),
        web_path: format!("{}/{}/{}", web_prefix, category, filename),
        filename,
        category,
        byte_size: outcome.byte_size,
        extension: outcome.extension.clone().unwrap_or_default(),
        fingerprint: None,
        dimensions: None,
        retrieved_at: Utc::now(),
    })
}
