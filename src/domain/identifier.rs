//! Resource identifiers and their extraction from share links.
//!
//! A share link is tried against an ordered list of shapes. The specific
//! shapes are anchored to the start of the reference so the generic
//! long-token fallback never wins over them.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::conversion::ConversionError;

/// Opaque token naming a hosted resource (`[A-Za-z0-9_-]+`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceIdentifier(String);

impl ResourceIdentifier {
    /// Validate a raw token against the identifier grammar
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty()
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

        valid.then(|| Self(raw.to_string()))
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One recognized share-link shape
#[derive(Debug, Clone)]
pub struct LinkShape {
    /// Shape name, used in debug logs
    pub name: &'static str,

    /// Pattern whose first capture group is the identifier
    pub pattern: Regex,
}

/// Ordered identifier extractor.
///
/// Shapes are tried in declaration order and the first match wins.
#[derive(Debug, Clone)]
pub struct Extractor {
    shapes: Vec<LinkShape>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    /// Extractor for the Drive share-link shapes
    pub fn new() -> Self {
        let shapes = vec![
            LinkShape {
                name: "view_path",
                pattern: compile(
                    r"^https?://drive\.google\.com/file/d/([A-Za-z0-9_-]+)/view(?:[/?#].*)?$",
                ),
            },
            LinkShape {
                name: "open_query",
                pattern: compile(r"^https?://drive\.google\.com/open\?id=([A-Za-z0-9_-]+)(?:[&#].*)?$"),
            },
            // Direct URLs rendered by the formatter
            LinkShape {
                name: "uc_query",
                pattern: compile(
                    r"^https?://drive\.google\.com/uc\?(?:[^#]*&)?id=([A-Za-z0-9_-]+)(?:[&#].*)?$",
                ),
            },
            LinkShape {
                name: "thumbnail_query",
                pattern: compile(
                    r"^https?://drive\.google\.com/thumbnail\?(?:[^#]*&)?id=([A-Za-z0-9_-]+)(?:[&#].*)?$",
                ),
            },
            LinkShape {
                name: "content_host",
                pattern: compile(
                    r"^https?://lh3\.googleusercontent\.com/d/([A-Za-z0-9_-]+)(?:=[^/?#]*)?(?:[?#].*)?$",
                ),
            },
            LinkShape {
                name: "preview_path",
                pattern: compile(
                    r"^https?://drive\.google\.com/file/d/([A-Za-z0-9_-]+)/preview(?:[/?#].*)?$",
                ),
            },
            LinkShape {
                name: "bare_token",
                pattern: compile(r"([A-Za-z0-9_-]{25,})"),
            },
        ];

        Self { shapes }
    }

    /// Build an extractor from custom shapes (tried in the given order)
    pub fn with_shapes(shapes: Vec<LinkShape>) -> Self {
        Self { shapes }
    }

    /// Names of the shapes in match order
    pub fn shape_names(&self) -> Vec<&'static str> {
        self.shapes.iter().map(|s| s.name).collect()
    }

    /// Extract the identifier embedded in a share link
    pub fn extract(&self, reference: &str) -> Result<ResourceIdentifier, ConversionError> {
        let trimmed = reference.trim();

        for shape in &self.shapes {
            let Some(captures) = shape.pattern.captures(trimmed) else {
                continue;
            };

            if let Some(id) = captures.get(1).and_then(|m| ResourceIdentifier::parse(m.as_str())) {
                tracing::debug!(shape = shape.name, %id, "Extracted identifier");
                return Ok(id);
            }
        }

        Err(ConversionError::Extraction {
            reference: trimmed.to_string(),
        })
    }
}

// Built-in patterns are literals covered by the tests below.
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in link pattern")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "1-8vowAYefIp4OFijb2WlfhhzOX9pIIO9";

    #[test]
    fn test_view_path_shape() {
        let extractor = Extractor::new();
        let url = format!("https://drive.google.com/file/d/{}/view?usp=sharing", ID);
        assert_eq!(extractor.extract(&url).unwrap().as_str(), ID);
    }

    #[test]
    fn test_open_query_shape() {
        let extractor = Extractor::new();
        let url = format!("https://drive.google.com/open?id={}", ID);
        assert_eq!(extractor.extract(&url).unwrap().as_str(), ID);
    }

    #[test]
    fn test_short_ids_need_specific_shape() {
        let extractor = Extractor::new();
        assert_eq!(
            extractor
                .extract("https://drive.google.com/file/d/abc123/view")
                .unwrap()
                .as_str(),
            "abc123"
        );
        assert!(extractor.extract("https://example.com/abc123").is_err());
    }

    #[test]
    fn test_bare_token_fallback() {
        let extractor = Extractor::new();
        let id = extractor.extract(&format!("  {}  ", ID)).unwrap();
        assert_eq!(id.as_str(), ID);
    }

    #[test]
    fn test_extraction_failure_is_a_value() {
        let extractor = Extractor::new();
        let err = extractor.extract("not a link at all").unwrap_err();
        assert!(matches!(err, ConversionError::Extraction { .. }));
    }

    #[test]
    fn test_specific_shapes_are_anchored() {
        let extractor = Extractor::new();
        // Embedded view shape is not at the start, so only the fallback applies
        let url = "see https://drive.google.com/file/d/short/view";
        assert!(extractor.extract(url).is_err());
    }

    #[test]
    fn test_direct_url_shapes_accept_short_ids() {
        let extractor = Extractor::new();
        for url in [
            "https://drive.google.com/uc?export=download&id=a-b_c",
            "https://drive.google.com/uc?id=a-b_c",
            "https://drive.google.com/thumbnail?id=a-b_c&sz=w400",
            "https://lh3.googleusercontent.com/d/a-b_c",
            "https://lh3.googleusercontent.com/d/a-b_c=w300-h300",
            "https://drive.google.com/file/d/a-b_c/preview",
        ] {
            assert_eq!(extractor.extract(url).unwrap().as_str(), "a-b_c", "url: {}", url);
        }
    }

    #[test]
    fn test_identifier_grammar() {
        assert!(ResourceIdentifier::parse("").is_none());
        assert!(ResourceIdentifier::parse("abc/def").is_none());
        assert!(ResourceIdentifier::parse("abc_DEF-123").is_some());
    }

    #[test]
    fn test_shape_order() {
        assert_eq!(
            Extractor::new().shape_names(),
            vec![
                "view_path",
                "open_query",
                "uc_query",
                "thumbnail_query",
                "content_host",
                "preview_path",
                "bare_token"
            ]
        );
    }
}
