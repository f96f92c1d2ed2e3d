//! Command-line interface for drivecat.
//!
//! Provides commands for converting share links, listing every direct
//! URL of one link, downloading a batch into the catalog tree, and the
//! separate deduplication pass.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{HttpTransport, Transport};
use crate::config::ResolvedConfig;
use crate::core::{load_references, Converter, Orchestrator, Prober};
use crate::domain::{
    BatchSummary, ErrorLog, Extractor, Formatter, Representation, ThumbnailSize,
};
use crate::library::{run_dedup, write_reports, CatalogLabels, OutputStore};

/// Distinct errors listed in the final summary
const SHOWN_ERRORS: usize = 5;

/// drivecat - share links to a categorized, deduplicated catalog
#[derive(Parser, Debug)]
#[command(name = "drivecat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert share links into direct URLs and write CSV/JSON reports
    Convert {
        /// File with one share link per line
        input_file: PathBuf,

        /// Representation (download, view, thumbnail, thumbnail_sized, preview, embed)
        #[arg(default_value = "view")]
        representation: String,

        /// Check each direct URL with a HEAD request (default)
        #[arg(long, overrides_with = "no_probe")]
        probe: bool,

        /// Skip the accessibility check
        #[arg(long, overrides_with = "probe")]
        no_probe: bool,

        /// Width for sized thumbnails
        #[arg(long, default_value = "600")]
        width: u32,

        /// Height for sized thumbnails
        #[arg(long, default_value = "600")]
        height: u32,
    },

    /// Print every direct URL for one share link
    Formats {
        /// Share link or bare identifier
        reference: String,
    },

    /// Download a batch into the categorized output tree
    Fetch {
        /// File with one share link per line
        input_file: PathBuf,

        /// Output directory (overrides config)
        #[arg(short, long, env = "DRIVECAT_OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Fingerprint stored files and report duplicates
    Dedup {
        /// Output directory (overrides config)
        #[arg(short, long, env = "DRIVECAT_OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Convert {
                input_file,
                representation,
                probe: _,
                no_probe,
                width,
                height,
            } => {
                let size = ThumbnailSize { width, height };
                convert(&input_file, &representation, !no_probe, size).await
            }
            Commands::Formats { reference } => show_formats(&reference).await,
            Commands::Fetch { input_file, output } => fetch(&input_file, output).await,
            Commands::Dedup { output } => dedup(output).await,
            Commands::Config => show_config().await,
        }
    }
}

fn http_transport(config: &ResolvedConfig) -> Result<Arc<dyn Transport>> {
    let transport = HttpTransport::new(&config.fetch.user_agent, config.fetch.request_timeout())?;
    Ok(Arc::new(transport))
}

/// Convert a file of share links
async fn convert(
    input_file: &Path,
    representation: &str,
    probe: bool,
    size: ThumbnailSize,
) -> Result<()> {
    // A bad representation would fail every item the same way
    let representation: Representation = representation.parse()?;

    let config = ResolvedConfig::load()?;
    let references = load_references(input_file).await?;

    let mut converter = Converter::new(Extractor::new(), Formatter::new(config.templates.clone()));
    if probe {
        let prober = Prober::new(http_transport(&config)?, config.fetch.probe_timeout());
        converter = converter.with_prober(prober);
    }

    println!(
        "Converting {} link(s) to '{}'{}...",
        references.len(),
        representation,
        if probe { " with accessibility check" } else { "" }
    );

    let report = converter
        .convert_batch(&references, representation, size)
        .await;

    for (idx, result) in report.results.iter().enumerate() {
        match (&result.direct_url, &result.error) {
            (Some(url), _) => {
                let access = match result.is_accessible {
                    Some(true) => " [accessible]",
                    Some(false) => " [inaccessible]",
                    None => "",
                };
                println!("{:>4}. {}{}", idx + 1, url, access);
            }
            (None, Some(error)) => println!("{:>4}. ERROR {}", idx + 1, error),
            (None, None) => {}
        }
    }

    let (csv_path, json_path) = write_reports(input_file, &report)?;

    print_summary("CONVERSION SUMMARY", &report.summary, &report.errors, probe);
    println!("Reports:");
    println!("  {}", csv_path.display());
    println!("  {}", json_path.display());

    Ok(())
}

/// Print all representations of one link
async fn show_formats(reference: &str) -> Result<()> {
    let config = ResolvedConfig::load()?;
    let formatter = Formatter::new(config.templates.clone());

    let identifier = Extractor::new().extract(reference)?;

    println!("File ID: {}", identifier);
    println!();
    for (label, url) in formatter.generate_all(&identifier) {
        println!("  {:<22} {}", label, url);
    }

    Ok(())
}

/// Download a batch and write the catalog outputs
async fn fetch(input_file: &Path, output: Option<PathBuf>) -> Result<()> {
    let config = ResolvedConfig::load()?.with_output(output);
    let references = load_references(input_file).await?;

    println!(
        "Downloading {} link(s) into {}",
        references.len(),
        config.output.display()
    );

    let orchestrator = Orchestrator::new(&config, http_transport(&config)?);
    let metadata = orchestrator.run(&references).await?;

    print_summary("DOWNLOAD SUMMARY", &metadata.summary, &metadata.errors, false);

    if !metadata.summary.categories.is_empty() {
        println!("Categories:");
        for (category, count) in &metadata.summary.categories {
            println!("  {:<14} {}", category, count);
        }
        println!();
    }

    let store = orchestrator.store();
    println!("Files saved in: {}", store.root().display());
    println!("Catalog:        {}", store.catalog_path().display());
    println!("\nRun `drivecat dedup` to fingerprint files and find duplicates.");

    Ok(())
}

/// Fingerprint stored files and rewrite the catalog
async fn dedup(output: Option<PathBuf>) -> Result<()> {
    let config = ResolvedConfig::load()?.with_output(output);
    let store = OutputStore::new(config.output.clone());
    let labels = CatalogLabels {
        name: &config.catalog.name,
        description: &config.catalog.description,
        display_prefix: &config.catalog.display_prefix,
    };

    let report = run_dedup(&store, &labels)
        .await
        .with_context(|| format!("Dedup failed for {}", store.root().display()))?;

    println!("Analyzed {} file(s)", report.analyzed);

    if !report.missing.is_empty() {
        println!("\nMissing files ({}):", report.missing.len());
        for path in &report.missing {
            println!("  - {}", path);
        }
    }

    if report.clusters.is_empty() {
        println!("\nNo duplicates found");
    } else {
        println!(
            "\n{} duplicate group(s), {} redundant file(s):",
            report.clusters.len(),
            report.redundant_files()
        );
        for cluster in &report.clusters {
            let short = cluster.fingerprint.get(..12).unwrap_or(&cluster.fingerprint);
            println!("  {} ({} files)", short, cluster.count);
            for file in &cluster.files {
                println!("    {}", file);
            }
        }
    }

    Ok(())
}

/// Show resolved configuration
async fn show_config() -> Result<()> {
    let cfg = ResolvedConfig::load()?;

    println!("{}", "=".repeat(60));
    println!("  drivecat configuration");
    println!("{}", "=".repeat(60));
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:       {}", cfg.home.display());
    println!("  Output:     {}", cfg.output.display());
    println!("  Web prefix: {}", cfg.web_prefix);
    println!();
    println!("Fetch:");
    println!("  User agent:      {}", cfg.fetch.user_agent);
    println!("  Min bytes:       {}", cfg.fetch.min_bytes);
    println!("  Item delay:      {}ms", cfg.fetch.item_delay_ms);
    println!("  Probe timeout:   {}s", cfg.fetch.probe_timeout_seconds);
    println!("  Request timeout: {}s", cfg.fetch.request_timeout_seconds);
    println!("  File prefix:     {}", cfg.fetch.file_prefix);
    println!();
    println!("Retry:");
    println!("  Max attempts: {}", cfg.retry.max_attempts);
    println!("  Delay:        {}ms (x{})", cfg.retry.initial_delay_ms, cfg.retry.backoff_multiplier);
    println!();
    println!("Categories (first match wins):");
    for rule in &cfg.categories.rules {
        println!("  {:<12} {}", rule.name, rule.keywords.join(", "));
    }
    println!("  {:<12} (fallback)", cfg.categories.fallback);
    println!();
    println!("Templates:");
    for repr in Representation::ALL {
        println!("  {:<16} {}", repr.name(), cfg.templates.template(repr));
    }

    Ok(())
}

/// Totals plus the first few distinct errors
fn print_summary(title: &str, summary: &BatchSummary, errors: &ErrorLog, probed: bool) {
    println!();
    println!("{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
    println!("Total:        {}", summary.total);
    println!("Successful:   {}", summary.successful);
    println!("Failed:       {}", summary.failed);
    if probed {
        println!("Accessible:   {}", summary.accessible);
        println!("Inaccessible: {}", summary.inaccessible);
    }
    println!("Success rate: {:.2}%", summary.success_rate());

    if !errors.is_empty() {
        let (shown, remainder) = errors.abbreviated(SHOWN_ERRORS);
        println!("\n{} error(s):", errors.len());
        for error in shown {
            println!("  - {}", error);
        }
        if remainder > 0 {
            println!("  ... and {} more", remainder);
        }
    }
    println!();
}
