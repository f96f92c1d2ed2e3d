//! Per-item fetch outcomes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result of retrieving one resource.
///
/// On success `stored_path` exists on disk and `byte_size` is at least the
/// configured minimum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOutcome {
    /// Whether the file was stored
    pub success: bool,

    /// Final location of the stored file
    pub stored_path: Option<PathBuf>,

    /// File name within the category directory
    pub filename: Option<String>,

    /// Category the file was filed under
    pub category: Option<String>,

    /// Bytes written
    pub byte_size: u64,

    /// Detected extension (without the dot)
    pub extension: Option<String>,

    /// Number of attempts made
    pub attempts: u32,

    /// Whether the interstitial bypass was taken
    #[serde(default)]
    pub bypassed_interstitial: bool,

    /// Last observed failure cause
    pub error: Option<String>,
}

impl FetchOutcome {
    /// Successful fetch
    pub fn stored(
        stored_path: PathBuf,
        filename: String,
        category: String,
        byte_size: u64,
        extension: String,
        attempts: u32,
    ) -> Self {
        Self {
            success: true,
            stored_path: Some(stored_path),
            filename: Some(filename),
            category: Some(category),
            byte_size,
            extension: Some(extension),
            attempts,
            bypassed_interstitial: false,
            error: None,
        }
    }

    /// Failed fetch
    pub fn failed(error: impl Into<String>, attempts: u32) -> Self {
        Self {
            success: false,
            stored_path: None,
            filename: None,
            category: None,
            byte_size: 0,
            extension: None,
            attempts,
            bypassed_interstitial: false,
            error: Some(error.into()),
        }
    }

    /// Mark that an interstitial page was bypassed
    pub fn with_bypass(mut self, bypassed: bool) -> Self {
        self.bypassed_interstitial = bypassed;
        self
    }
}
