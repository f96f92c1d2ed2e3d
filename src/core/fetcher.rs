//! Resilient content retrieval.
//!
//! One attempt runs a small protocol state machine:
//!
//! ```text
//! AwaitingResponse ──► DirectContent ─────────────────────────────► Done
//!        │
//!        └─► InterstitialDetected ─► AwaitingConfirmedResponse ──► Done
//! ```
//!
//! The interstitial bypass is taken at most once per attempt. Whole
//! attempts are repeated under a [`RetryPolicy`]; storage failures are
//! never retried and abort the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use regex::Regex;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{ResponseBody, Transport, TransportError, TransportResponse};
use crate::domain::{FetchOutcome, ResourceIdentifier};

use super::categorizer::Categorizer;
use super::retry::RetryPolicy;
use super::sniff::{detect_extension, looks_like_html, DetectionSource};

/// Bytes buffered before deciding between content and interstitial
const PEEK_BYTES: usize = 64 * 1024;

/// Phrases that identify the host's download confirmation page
const INTERSTITIAL_MARKERS: [&str; 3] = ["download warning", "download_warning", "virus scan warning"];

/// Errors from a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Interstitial page could not be bypassed")]
    UnresolvedInterstitial,

    #[error("File too small ({size} bytes < {minimum}), probably an error page")]
    TooSmall { size: u64, minimum: u64 },

    #[error("Storage failure at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { .. } => true,
            Self::Transport(e) => !matches!(e, TransportError::InvalidUrl(_)),
            Self::UnresolvedInterstitial | Self::TooSmall { .. } | Self::Storage { .. } => false,
        }
    }

    fn storage(path: &Path, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Where and how fetched files are stored
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Root of the category directories
    pub output_dir: PathBuf,

    /// File name prefix (`<prefix>_<identifier>.<ext>`)
    pub file_prefix: String,

    /// Extension used when neither header nor signature is conclusive
    pub default_extension: String,

    /// Files below this size are rejected
    pub min_bytes: u64,

    /// Retry policy for transient failures
    pub retry: RetryPolicy,

    /// Category assignment for stored files
    pub categorizer: Categorizer,
}

/// A successfully stored file
#[derive(Debug, Clone)]
struct Downloaded {
    path: PathBuf,
    filename: String,
    category: String,
    size: u64,
    extension: String,
    source: DetectionSource,
    bypassed: bool,
}

/// Protocol states of one attempt
enum FetchState {
    AwaitingResponse { url: String },
    InterstitialDetected { page: String, page_url: String },
    AwaitingConfirmedResponse { url: String },
    Done(Downloaded),
}

/// Pulls the confirmation link out of an interstitial page
struct InterstitialParser {
    confirm_link: Regex,
    form_action: Regex,
    hidden_input: Regex,
    confirm_token: Regex,
}

impl InterstitialParser {
    fn new() -> Self {
        Self {
            confirm_link: Regex::new(r#"(?:href|action)="([^"]*confirm=[^"]*)""#)
                .expect("built-in confirm link pattern"),
            form_action: Regex::new(r#"<form[^>]*id="download-form"[^>]*action="([^"]+)""#)
                .expect("built-in form pattern"),
            hidden_input: Regex::new(
                r#"<input[^>]*type="hidden"[^>]*name="([^"]+)"[^>]*value="([^"]*)""#,
            )
            .expect("built-in hidden input pattern"),
            confirm_token: Regex::new(r"confirm=([0-9A-Za-z_-]+)").expect("built-in token pattern"),
        }
    }

    /// Whether a response is the host's confirmation page
    fn is_interstitial(&self, content_type: Option<&str>, head: &[u8]) -> bool {
        if !looks_like_html(content_type, head) {
            return false;
        }
        let text = String::from_utf8_lossy(head).to_lowercase();
        INTERSTITIAL_MARKERS.iter().any(|m| text.contains(m))
    }

    /// Resolve the confirmed download URL from the page body
    fn confirmation_url(&self, page: &str, page_url: &str, original_url: &str) -> Option<String> {
        let base = reqwest::Url::parse(page_url)
            .or_else(|_| reqwest::Url::parse(original_url))
            .ok()?;

        if let Some(link) = self.confirm_link.captures(page).and_then(|c| c.get(1)) {
            let link = unescape_html(link.as_str());
            return base.join(&link).ok().map(String::from);
        }

        if let Some(action) = self.form_action.captures(page).and_then(|c| c.get(1)) {
            let mut url = base.join(&unescape_html(action.as_str())).ok()?;
            {
                let mut query = url.query_pairs_mut();
                for input in self.hidden_input.captures_iter(page) {
                    query.append_pair(&input[1], &unescape_html(&input[2]));
                }
            }
            return Some(url.into());
        }

        let token = self.confirm_token.captures(page)?.get(1)?.as_str().to_string();
        let mut url = reqwest::Url::parse(original_url).ok()?;
        url.query_pairs_mut().append_pair("confirm", &token);
        Some(url.into())
    }
}

fn unescape_html(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("\\u003d", "=")
        .replace("\\u0026", "&")
}

/// Read from the body until at least `limit` bytes are buffered or it ends
async fn peek(body: &mut Box<dyn ResponseBody>, limit: usize) -> Result<Vec<u8>, FetchError> {
    let mut head = Vec::new();
    while head.len() < limit {
        match body.chunk().await? {
            Some(chunk) => head.extend_from_slice(&chunk),
            None => break,
        }
    }
    Ok(head)
}

async fn remove_if_exists(path: &Path) -> Result<(), FetchError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FetchError::storage(path, e)),
    }
}

/// Downloads one resource into the categorized output tree
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    options: FetchOptions,
    parser: InterstitialParser,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, options: FetchOptions) -> Self {
        Self {
            transport,
            options,
            parser: InterstitialParser::new(),
        }
    }

    /// Get the fetch options
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Retrieve `url` and store it as `<prefix>_<identifier>.<ext>`.
    ///
    /// Per-item failures come back as an unsuccessful [`FetchOutcome`];
    /// `Err` means the output tree itself cannot be written.
    #[instrument(skip_all, fields(identifier = %identifier))]
    pub async fn fetch(&self, url: &str, identifier: &ResourceIdentifier) -> Result<FetchOutcome> {
        let policy = &self.options.retry;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match self.attempt(url, identifier).await {
                Ok(downloaded) => {
                    info!(
                        file = %downloaded.filename,
                        category = %downloaded.category,
                        bytes = downloaded.size,
                        detected_by = ?downloaded.source,
                        attempt,
                        "Stored file"
                    );

                    return Ok(FetchOutcome::stored(
                        downloaded.path,
                        downloaded.filename,
                        downloaded.category,
                        downloaded.size,
                        downloaded.extension,
                        attempt,
                    )
                    .with_bypass(downloaded.bypassed));
                }
                Err(e @ FetchError::Storage { .. }) => {
                    return Err(anyhow::Error::new(e).context("Output directory is not writable"));
                }
                Err(e) if policy.should_retry(attempt, &e) => {
                    let delay = policy.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Fetch failed permanently");
                    return Ok(FetchOutcome::failed(
                        format!("Download failed after {} attempt(s): {}", attempt, e),
                        attempt,
                    ));
                }
            }
        }
    }

    /// One pass through the protocol state machine
    async fn attempt(
        &self,
        url: &str,
        identifier: &ResourceIdentifier,
    ) -> Result<Downloaded, FetchError> {
        let mut state = FetchState::AwaitingResponse {
            url: url.to_string(),
        };

        loop {
            state = match state {
                FetchState::AwaitingResponse { url } => {
                    let mut response = self.open(&url).await?;
                    let head = peek(&mut response.body, PEEK_BYTES).await?;

                    if self
                        .parser
                        .is_interstitial(response.content_type.as_deref(), &head)
                    {
                        FetchState::InterstitialDetected {
                            page: String::from_utf8_lossy(&head).into_owned(),
                            page_url: response.url,
                        }
                    } else {
                        FetchState::Done(self.store(response, head, identifier).await?)
                    }
                }
                FetchState::InterstitialDetected { page, page_url } => {
                    let confirmed = self
                        .parser
                        .confirmation_url(&page, &page_url, url)
                        .ok_or(FetchError::UnresolvedInterstitial)?;
                    debug!(%confirmed, "Bypassing interstitial page");
                    FetchState::AwaitingConfirmedResponse { url: confirmed }
                }
                FetchState::AwaitingConfirmedResponse { url } => {
                    let mut response = self.open(&url).await?;
                    let head = peek(&mut response.body, PEEK_BYTES).await?;

                    // Nested interstitials are not chased
                    if self
                        .parser
                        .is_interstitial(response.content_type.as_deref(), &head)
                    {
                        return Err(FetchError::UnresolvedInterstitial);
                    }

                    let mut downloaded = self.store(response, head, identifier).await?;
                    downloaded.bypassed = true;
                    FetchState::Done(downloaded)
                }
                FetchState::Done(downloaded) => return Ok(downloaded),
            };
        }
    }

    async fn open(&self, url: &str) -> Result<TransportResponse, FetchError> {
        let response = self.transport.get(url).await?;
        if response.status != 200 {
            return Err(FetchError::Status {
                status: response.status,
            });
        }
        Ok(response)
    }

    /// Stream the body to `<output>/<category>/<file>` via a `.part` file
    async fn store(
        &self,
        mut response: TransportResponse,
        head: Vec<u8>,
        identifier: &ResourceIdentifier,
    ) -> Result<Downloaded, FetchError> {
        let (extension, source) = detect_extension(
            response.content_type.as_deref(),
            &head,
            &self.options.default_extension,
        );
        let filename = format!("{}_{}.{}", self.options.file_prefix, identifier, extension);
        let category = self.options.categorizer.categorize(&filename).to_string();

        let dir = self.options.output_dir.join(&category);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| FetchError::storage(&dir, e))?;

        let path = dir.join(&filename);
        let part_path = dir.join(format!("{}.part", filename));

        let size = match write_body(&part_path, head, &mut response.body).await {
            Ok(size) => size,
            Err(e) => {
                remove_if_exists(&part_path).await?;
                return Err(e);
            }
        };

        if size < self.options.min_bytes {
            remove_if_exists(&part_path).await?;
            return Err(FetchError::TooSmall {
                size,
                minimum: self.options.min_bytes,
            });
        }

        fs::rename(&part_path, &path)
            .await
            .map_err(|e| FetchError::storage(&path, e))?;

        Ok(Downloaded {
            path,
            filename,
            category,
            size,
            extension,
            source,
            bypassed: false,
        })
    }
}

async fn write_body(
    path: &Path,
    head: Vec<u8>,
    body: &mut Box<dyn ResponseBody>,
) -> Result<u64, FetchError> {
    let mut file = File::create(path)
        .await
        .map_err(|e| FetchError::storage(path, e))?;

    file.write_all(&head)
        .await
        .map_err(|e| FetchError::storage(path, e))?;
    let mut written = head.len() as u64;

    while let Some(chunk) = body.chunk().await? {
        file.write_all(&chunk)
            .await
            .map_err(|e| FetchError::storage(path, e))?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| FetchError::storage(path, e))?;
    Ok(written)
}
