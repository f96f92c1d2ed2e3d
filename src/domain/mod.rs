//! Domain types for drivecat.
//!
//! This module contains the core data structures:
//! - Identifier: share-link parsing into resource identifiers
//! - Representation: direct URL templates and formatting
//! - Conversion / Outcome: per-item results
//! - Summary: batch counters and error log

pub mod conversion;
pub mod identifier;
pub mod outcome;
pub mod representation;
pub mod summary;

// Re-export commonly used types
pub use conversion::{ConversionError, ConversionResult};
pub use identifier::{Extractor, LinkShape, ResourceIdentifier};
pub use outcome::FetchOutcome;
pub use representation::{Formatter, Representation, ThumbnailSize, UrlTemplates, THUMBNAIL_SIZES};
pub use summary::{BatchSummary, ErrorLog, ItemError};
