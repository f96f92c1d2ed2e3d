//! Configuration for drivecat.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (DRIVECAT_HOME, DRIVECAT_OUTPUT)
//! 2. Config file (.drivecat/config.yaml)
//! 3. Defaults (~/.drivecat)
//!
//! Config file discovery:
//! - Searches current directory and parents for .drivecat/config.yaml
//! - Paths in config file are relative to the project root (parent of .drivecat/)
//!
//! Each CLI command resolves the configuration once at its start and hands
//! the immutable result to the components it builds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::categorizer::{default_rules, Categorizer, CategoryRule, DEFAULT_FALLBACK};
use crate::core::RetryPolicy;
use crate::domain::UrlTemplates;

const CONFIG_DIR: &str = ".drivecat";
const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub categories: CategorySettings,
    #[serde(default)]
    pub templates: UrlTemplates,
    #[serde(default)]
    pub catalog: CatalogSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to project root)
    pub home: Option<String>,
    /// Output tree for fetched files and catalogs (relative to project root)
    pub output: Option<String>,
    /// URL prefix under which the output tree is served
    pub web_prefix: Option<String>,
}

/// Retrieval settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub user_agent: String,
    /// Smallest plausible file; anything below is an error page
    pub min_bytes: u64,
    /// Pause between downloads
    pub item_delay_ms: u64,
    pub probe_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
    pub file_prefix: String,
    pub default_extension: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36"
                .to_string(),
            min_bytes: 1024,
            item_delay_ms: 1000,
            probe_timeout_seconds: 10,
            request_timeout_seconds: 30,
            file_prefix: "cosmetic".to_string(),
            default_extension: "jpg".to_string(),
        }
    }
}

impl FetchSettings {
    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Category rule table (order matters)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorySettings {
    pub fallback: String,
    pub rules: Vec<CategoryRule>,
}

impl Default for CategorySettings {
    fn default() -> Self {
        Self {
            fallback: DEFAULT_FALLBACK.to_string(),
            rules: default_rules(),
        }
    }
}

impl CategorySettings {
    pub fn categorizer(&self) -> Categorizer {
        Categorizer::new(self.rules.clone(), self.fallback.clone())
    }
}

/// Catalog document labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub name: String,
    pub description: String,
    /// Display names are `<display_prefix> #001`, `#002`, ...
    pub display_prefix: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            name: "Catálogo de Cosméticos".to_string(),
            description: "Coleção completa de produtos cosméticos".to_string(),
            display_prefix: "Cosmético Premium".to_string(),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to drivecat home
    pub home: PathBuf,
    /// Output tree for fetched files and catalogs
    pub output: PathBuf,
    /// URL prefix of the output tree
    pub web_prefix: String,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub fetch: FetchSettings,
    pub retry: RetryPolicy,
    pub categories: CategorySettings,
    pub templates: UrlTemplates,
    pub catalog: CatalogSettings,
}

impl ResolvedConfig {
    /// Defaults rooted at `home`
    pub fn with_home(home: PathBuf) -> Self {
        Self {
            output: home.join("output"),
            home,
            web_prefix: default_web_prefix(),
            config_file: None,
            fetch: FetchSettings::default(),
            retry: RetryPolicy::default(),
            categories: CategorySettings::default(),
            templates: UrlTemplates::default(),
            catalog: CatalogSettings::default(),
        }
    }

    /// Load configuration from all sources, searching upward from the current directory
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        let default_home = dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(CONFIG_DIR);

        load_from(&cwd, default_home, |key| std::env::var(key).ok())
    }

    /// Replace the output directory (command-line override)
    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        if let Some(output) = output {
            self.output = output;
        }
        self
    }
}

fn default_web_prefix() -> String {
    "/images/cosmeticos".to_string()
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn load_from(
    start: &Path,
    default_home: PathBuf,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let config_file = find_config_file(start);

    let (file, base_dir) = match &config_file {
        Some(path) => {
            let file = load_config_file(path)?;
            // .drivecat/config.yaml -> project root
            let base = path
                .parent()
                .and_then(|p| p.parent())
                .unwrap_or(Path::new("."))
                .to_path_buf();
            (file, Some(base))
        }
        None => (ConfigFile::default(), None),
    };

    let home = match (env("DRIVECAT_HOME"), &file.paths.home, &base_dir) {
        (Some(env_home), _, _) => PathBuf::from(env_home),
        (None, Some(home), Some(base)) => resolve_path(base, home),
        _ => default_home,
    };

    let output = match (env("DRIVECAT_OUTPUT"), &file.paths.output, &base_dir) {
        (Some(env_output), _, _) => PathBuf::from(env_output),
        (None, Some(output), Some(base)) => resolve_path(base, output),
        _ => home.join("output"),
    };

    Ok(ResolvedConfig {
        home,
        output,
        web_prefix: file.paths.web_prefix.unwrap_or_else(default_web_prefix),
        config_file,
        fetch: file.fetch,
        retry: file.retry,
        categories: file.categories,
        templates: file.templates,
        catalog: file.catalog,
    })
}
