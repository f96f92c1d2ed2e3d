//! Core pipeline logic.
//!
//! This module contains:
//! - Converter: batch conversion with partial-failure isolation
//! - Prober: best-effort liveness checks
//! - Fetcher: resilient retrieval with interstitial bypass
//! - RetryPolicy: bounded retries for the fetcher
//! - Categorizer: keyword-based category assignment
//! - Sniff: content kind detection and image headers
//! - Orchestrator: the sequential download run

pub mod categorizer;
pub mod convert;
pub mod fetcher;
pub mod orchestrator;
pub mod probe;
pub mod retry;
pub mod sniff;

// Re-export commonly used types
pub use categorizer::{Categorizer, CategoryRule};
pub use convert::{load_references, parse_references, BatchReport, Converter};
pub use fetcher::{FetchError, FetchOptions, Fetcher};
pub use orchestrator::Orchestrator;
pub use probe::Prober;
pub use retry::RetryPolicy;
