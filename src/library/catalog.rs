//! Catalog of stored files, grouped by category for presentation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::sniff::Dimensions;
use crate::domain::ResourceIdentifier;

use super::metadata::BatchMetadata;

/// Catalog document format version
pub const CATALOG_VERSION: &str = "2.0";

/// A stored file as recorded by the download run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub identifier: ResourceIdentifier,

    /// Share link the file came from
    pub reference: String,

    /// File name within the category directory
    pub filename: String,

    pub category: String,

    /// `<web_prefix>/<category>/<filename>`
    pub web_path: String,

    pub byte_size: u64,

    pub extension: String,

    /// SHA-256 of the contents (set by the dedup pass)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    /// Pixel dimensions (set by the dedup pass)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,

    pub retrieved_at: DateTime<Utc>,
}

impl CatalogEntry {
    /// Path of the file relative to the output root
    pub fn relative_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.category).join(&self.filename)
    }
}

/// Catalog header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogHeader {
    pub name: String,
    pub description: String,
    pub version: String,
    pub total_products: usize,
    pub categories: Vec<String>,
    pub duplicate_groups: usize,
    pub last_updated: DateTime<Utc>,
}

/// One product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    /// Sequential display id (`item_001`)
    pub id: String,
    pub original_id: ResourceIdentifier,
    /// Display name (`<prefix> #001`)
    pub name: String,
    pub image: String,
    pub filename: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    pub original_url: String,
    pub added_at: DateTime<Utc>,
}

/// Products of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCategory {
    pub name: String,
    pub count: usize,
    pub products: Vec<CatalogProduct>,
}

/// The persisted `catalog.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub metadata: CatalogHeader,
    pub categories: BTreeMap<String, CatalogCategory>,
}

/// Labels used when building a catalog
#[derive(Debug, Clone)]
pub struct CatalogLabels<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub display_prefix: &'a str,
}

impl CatalogDocument {
    /// Build the catalog from a batch record.
    ///
    /// Display ids follow the order of `metadata.entries`, which is the
    /// input order of the run, so they are stable across rebuilds.
    pub fn build(metadata: &BatchMetadata, labels: &CatalogLabels<'_>) -> Self {
        let mut categories: BTreeMap<String, CatalogCategory> = BTreeMap::new();

        for (idx, entry) in metadata.entries.iter().enumerate() {
            let seq = idx + 1;
            let product = CatalogProduct {
                id: display_id(seq),
                original_id: entry.identifier.clone(),
                name: format!("{} #{:03}", labels.display_prefix, seq),
                image: entry.web_path.clone(),
                filename: entry.filename.clone(),
                size: entry.byte_size,
                hash: entry.fingerprint.clone(),
                dimensions: entry.dimensions,
                aspect_ratio: entry.dimensions.map(|d| d.aspect_ratio()),
                original_url: entry.reference.clone(),
                added_at: entry.retrieved_at,
            };

            let category = categories
                .entry(entry.category.clone())
                .or_insert_with(|| CatalogCategory {
                    name: title_case(&entry.category),
                    count: 0,
                    products: Vec::new(),
                });
            category.count += 1;
            category.products.push(product);
        }

        Self {
            metadata: CatalogHeader {
                name: labels.name.to_string(),
                description: labels.description.to_string(),
                version: CATALOG_VERSION.to_string(),
                total_products: metadata.entries.len(),
                categories: categories.keys().cloned().collect(),
                duplicate_groups: metadata.duplicates.len(),
                last_updated: Utc::now(),
            },
            categories,
        }
    }

    /// Number of products across all categories
    pub fn len(&self) -> usize {
        self.categories.values().map(|c| c.products.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All products in display-id order
    pub fn products(&self) -> Vec<&CatalogProduct> {
        let mut products: Vec<_> = self.categories.values().flat_map(|c| &c.products).collect();
        products.sort_by(|a, b| a.id.cmp(&b.id));
        products
    }
}

/// Aggregate statistics over a batch record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub per_category: BTreeMap<String, usize>,
    pub total_bytes: u64,
    pub average_bytes: u64,
    pub duplicate_clusters: usize,
}

impl CatalogStats {
    pub fn compute(metadata: &BatchMetadata) -> Self {
        let total_bytes: u64 = metadata.entries.iter().map(|e| e.byte_size).sum();
        let average_bytes = if metadata.entries.is_empty() {
            0
        } else {
            total_bytes / metadata.entries.len() as u64
        };

        let mut per_category = BTreeMap::new();
        for entry in &metadata.entries {
            *per_category.entry(entry.category.clone()).or_insert(0) += 1;
        }

        Self {
            total: metadata.summary.total,
            successful: metadata.summary.successful,
            failed: metadata.summary.failed,
            success_rate: metadata.summary.success_rate(),
            per_category,
            total_bytes,
            average_bytes,
            duplicate_clusters: metadata.duplicates.len(),
        }
    }
}

fn display_id(seq: usize) -> String {
    format!("item_{:03}", seq)
}

fn title_case(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
