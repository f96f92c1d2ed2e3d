//! Keyword-based category assignment.
//!
//! Rules are checked in declaration order and the first rule with a
//! matching keyword wins. The order is part of the contract: with the
//! default table `lip_liner.jpg` files under `batom`, not `delineador`.

use serde::{Deserialize, Serialize};

/// Label returned when no rule matches
pub const DEFAULT_FALLBACK: &str = "outros";

/// One category and the keywords that select it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,

    #[serde(default)]
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

/// Default cosmetics rule table
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("batom", &["batom", "lipstick", "labial", "lip", "gloss"]),
        CategoryRule::new("base", &["base", "foundation", "fundacao", "fond de teint"]),
        CategoryRule::new("sombra", &["sombra", "eyeshadow", "paleta", "ombre"]),
        CategoryRule::new("blush", &["blush", "rouge", "blusher"]),
        CategoryRule::new("rimel", &["rimel", "mascara", "cilios", "lashes"]),
        CategoryRule::new("delineador", &["delineador", "eyeliner", "kajal", "liner"]),
        CategoryRule::new("corretivo", &["corretivo", "concealer", "correcteur"]),
        CategoryRule::new("po", &["po", "powder", "pó", "poudre"]),
        CategoryRule::new("bronzer", &["bronzer", "bronzeador", "bronze"]),
        CategoryRule::new("primer", &["primer", "pre-base", "prebase"]),
        CategoryRule::new("iluminador", &["iluminador", "highlighter", "glow"]),
        CategoryRule::new("contorno", &["contorno", "contouring", "sculpt"]),
    ]
}

/// Deterministic, total filename categorizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorizer {
    rules: Vec<CategoryRule>,
    fallback: String,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(default_rules(), DEFAULT_FALLBACK)
    }
}

impl Categorizer {
    pub fn new(rules: Vec<CategoryRule>, fallback: impl Into<String>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| CategoryRule {
                keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
                name: rule.name,
            })
            .collect();

        Self {
            rules,
            fallback: fallback.into(),
        }
    }

    /// Reserved label for unmatched names
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Every label this categorizer can return, in declaration order
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.rules.iter().map(|r| r.name.as_str()).collect();
        if !labels.contains(&self.fallback.as_str()) {
            labels.push(&self.fallback);
        }
        labels
    }

    /// Category for a file name
    pub fn categorize(&self, filename: &str) -> &str {
        let lower = filename.to_lowercase();

        self.rules
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .any(|k| !k.is_empty() && lower.contains(k.as_str()))
            })
            .map(|rule| rule.name.as_str())
            .unwrap_or(&self.fallback)
    }
}
