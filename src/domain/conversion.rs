//! Per-item conversion results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::identifier::ResourceIdentifier;
use super::representation::Representation;

/// Errors raised while converting a share link
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Reference matches no known identifier shape (per-item, non-fatal)
    #[error("Could not extract a file identifier from: {reference}")]
    Extraction { reference: String },

    /// Requested representation is not in the enumerated set (configuration error)
    #[error("Unsupported representation: \"{name}\"")]
    UnsupportedRepresentation { name: String },
}

/// Outcome of converting one share link.
///
/// `success` is true iff an identifier was extracted and the template was
/// rendered; `error` is set iff `success` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Whether conversion succeeded
    pub success: bool,

    /// The share link as supplied
    pub reference: String,

    /// Extracted identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<ResourceIdentifier>,

    /// Direct-fetch URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_url: Option<String>,

    /// Representation requested for this item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub representation: Option<Representation>,

    /// Failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Liveness probe result (only set when probing was requested)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_accessible: Option<bool>,
}

impl ConversionResult {
    /// Create a successful result
    pub fn converted(
        reference: impl Into<String>,
        identifier: ResourceIdentifier,
        direct_url: String,
        representation: Representation,
    ) -> Self {
        Self {
            success: true,
            reference: reference.into(),
            identifier: Some(identifier),
            direct_url: Some(direct_url),
            representation: Some(representation),
            error: None,
            is_accessible: None,
        }
    }

    /// Create a failed result
    pub fn failed(reference: impl Into<String>, error: &ConversionError) -> Self {
        Self {
            success: false,
            reference: reference.into(),
            identifier: None,
            direct_url: None,
            representation: None,
            error: Some(error.to_string()),
            is_accessible: None,
        }
    }

    /// Record the probe result
    pub fn with_accessibility(mut self, accessible: bool) -> Self {
        self.is_accessible = Some(accessible);
        self
    }
}
