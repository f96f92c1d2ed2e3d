//! Direct-access representations and URL formatting.
//!
//! Each representation maps to one URL template with `{identifier}` and,
//! for sized thumbnails, `{width}`/`{height}` placeholders.

use serde::{Deserialize, Serialize};

use super::conversion::ConversionError;
use super::identifier::ResourceIdentifier;

/// Sizes the sized thumbnail is expanded into by [`Formatter::generate_all`]
pub const THUMBNAIL_SIZES: [u32; 4] = [300, 600, 800, 1200];

/// Enumerated direct-access URL shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Representation {
    #[serde(rename = "download")]
    Download,

    #[serde(rename = "view")]
    View,

    #[serde(rename = "thumbnail")]
    Thumbnail,

    #[serde(rename = "thumbnail_sized")]
    SizedThumbnail,

    #[serde(rename = "preview")]
    Preview,

    #[serde(rename = "embed")]
    Embed,
}

impl Representation {
    /// All representations in display order
    pub const ALL: [Representation; 6] = [
        Representation::Download,
        Representation::View,
        Representation::Thumbnail,
        Representation::SizedThumbnail,
        Representation::Preview,
        Representation::Embed,
    ];

    /// Canonical name
    pub fn name(self) -> &'static str {
        match self {
            Representation::Download => "download",
            Representation::View => "view",
            Representation::Thumbnail => "thumbnail",
            Representation::SizedThumbnail => "thumbnail_sized",
            Representation::Preview => "preview",
            Representation::Embed => "embed",
        }
    }
}

impl std::fmt::Display for Representation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Representation {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Representation::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| ConversionError::UnsupportedRepresentation {
                name: s.to_string(),
            })
    }
}

/// Width and height for sized thumbnails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ThumbnailSize {
    fn default() -> Self {
        Self::square(600)
    }
}

impl ThumbnailSize {
    pub fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }
}

/// URL template per representation.
///
/// Missing keys in a config file fall back to the Drive defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlTemplates {
    pub download: String,
    pub view: String,
    pub thumbnail: String,
    pub thumbnail_sized: String,
    pub preview: String,
    pub embed: String,
}

impl Default for UrlTemplates {
    fn default() -> Self {
        Self {
            download: "https://drive.google.com/uc?export=download&id={identifier}".to_string(),
            view: "https://drive.google.com/uc?id={identifier}".to_string(),
            thumbnail: "https://lh3.googleusercontent.com/d/{identifier}".to_string(),
            thumbnail_sized: "https://lh3.googleusercontent.com/d/{identifier}=w{width}-h{height}"
                .to_string(),
            preview: "https://drive.google.com/thumbnail?id={identifier}".to_string(),
            embed: "https://drive.google.com/file/d/{identifier}/preview".to_string(),
        }
    }
}

impl UrlTemplates {
    /// Template for a representation
    pub fn template(&self, representation: Representation) -> &str {
        match representation {
            Representation::Download => &self.download,
            Representation::View => &self.view,
            Representation::Thumbnail => &self.thumbnail,
            Representation::SizedThumbnail => &self.thumbnail_sized,
            Representation::Preview => &self.preview,
            Representation::Embed => &self.embed,
        }
    }
}

/// Renders direct URLs from an immutable template table
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    templates: UrlTemplates,
}

impl Formatter {
    /// Create a formatter over a template table
    pub fn new(templates: UrlTemplates) -> Self {
        Self { templates }
    }

    /// Get the template table
    pub fn templates(&self) -> &UrlTemplates {
        &self.templates
    }

    /// Render the URL for a representation
    pub fn format(
        &self,
        identifier: &ResourceIdentifier,
        representation: Representation,
        size: ThumbnailSize,
    ) -> String {
        self.templates
            .template(representation)
            .replace("{identifier}", identifier.as_str())
            .replace("{width}", &size.width.to_string())
            .replace("{height}", &size.height.to_string())
    }

    /// Render the URL for a representation given by name
    pub fn format_named(
        &self,
        identifier: &ResourceIdentifier,
        name: &str,
        size: ThumbnailSize,
    ) -> Result<String, ConversionError> {
        let representation: Representation = name.parse()?;
        Ok(self.format(identifier, representation, size))
    }

    /// Every representation for one identifier, with the sized thumbnail
    /// expanded into `thumbnail_{n}x{n}` for each of [`THUMBNAIL_SIZES`]
    pub fn generate_all(&self, identifier: &ResourceIdentifier) -> Vec<(String, String)> {
        let mut formats = Vec::with_capacity(Representation::ALL.len() + THUMBNAIL_SIZES.len());

        for representation in Representation::ALL {
            if representation == Representation::SizedThumbnail {
                for side in THUMBNAIL_SIZES {
                    formats.push((
                        format!("thumbnail_{side}x{side}"),
                        self.format(identifier, representation, ThumbnailSize::square(side)),
                    ));
                }
            } else {
                formats.push((
                    representation.name().to_string(),
                    self.format(identifier, representation, ThumbnailSize::default()),
                ));
            }
        }

        formats
    }
}
