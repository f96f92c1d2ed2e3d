//! Output tree, catalog and reports.
//!
//! # Storage Layout
//!
//! ```text
//! <output>/
//! ├── .drivecat.lock            # Writer lock
//! ├── metadata.json             # Batch record: counters, entries, errors
//! ├── catalog.json              # Products grouped by category
//! ├── usage_guide.md            # Layout and catalog shape
//! └── <category>/
//!     └── <prefix>_<id>.<ext>   # Stored files
//! ```

pub mod catalog;
pub mod dedup;
pub mod guide;
pub mod metadata;
pub mod report;
pub mod store;

pub use catalog::{CatalogDocument, CatalogEntry, CatalogLabels, CatalogStats};
pub use dedup::{fingerprint, group_by_fingerprint, run_dedup, DedupReport, DuplicateCluster};
pub use metadata::BatchMetadata;
pub use report::write_reports;
pub use store::{write_atomic, OutputStore};
