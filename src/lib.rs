//! drivecat - share links to a categorized, deduplicated catalog
//!
//! Converts share links of a cloud file store into direct URLs, downloads
//! the files in bulk, files them by category, and assembles a catalog
//! describing the result.
//!
//! # Pipeline
//!
//! ```text
//! links -> Extractor -> Formatter -> {Prober | Fetcher} -> Categorizer
//!       -> stored file + CatalogEntry -> metadata.json / catalog.json
//!       -> (later) dedup pass -> fingerprints, duplicate clusters
//! ```
//!
//! Items are processed one at a time in input order. A failed item is
//! recorded and the batch continues; only configuration and storage
//! failures stop a run.
//!
//! # Modules
//!
//! - `adapters`: HTTP transport seam
//! - `config`: Config file discovery and resolved settings
//! - `core`: Conversion, probing, fetching, categorization, orchestration
//! - `domain`: Identifiers, representations, per-item results
//! - `library`: Output tree, catalog, dedup and reports
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Convert links and write links_converted.csv/.json
//! drivecat convert links.txt download
//!
//! # Download into the catalog tree
//! drivecat fetch links.txt --output public/images/cosmeticos
//!
//! # Fingerprint stored files and report duplicates
//! drivecat dedup --output public/images/cosmeticos
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod library;

// Re-export main types at crate root for convenience
pub use config::ResolvedConfig;
pub use core::{Converter, Fetcher, Orchestrator, RetryPolicy};
pub use domain::{ConversionResult, Extractor, FetchOutcome, Formatter, Representation};
pub use library::{BatchMetadata, CatalogDocument, OutputStore};
