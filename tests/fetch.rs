//! Fetcher Integration Tests
//!
//! Retry budget, interstitial bypass, size threshold and storage layout,
//! all against a scripted transport.

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{interstitial_page, png_bytes, Reply, ScriptedTransport, ID_A};
use drivecat::adapters::TransportError;
use drivecat::core::{Categorizer, FetchOptions, Fetcher, RetryPolicy};
use drivecat::domain::ResourceIdentifier;
use tempfile::TempDir;

const URL: &str = "https://drive.google.com/uc?export=download&id=1AbCdEfGhIjKlMnOpQrStUvWxYz012345";

fn options(output: &Path) -> FetchOptions {
    FetchOptions {
        output_dir: output.to_path_buf(),
        file_prefix: "cosmetic".to_string(),
        default_extension: "jpg".to_string(),
        min_bytes: 1024,
        retry: RetryPolicy::immediate(3),
        categorizer: Categorizer::default(),
    }
}

fn identifier() -> ResourceIdentifier {
    ResourceIdentifier::parse(ID_A).unwrap()
}

fn leftover_part_files(dir: &Path) -> usize {
    walk(dir)
        .iter()
        .filter(|p| p.extension().is_some_and(|e| e == "part"))
        .count()
}

fn walk(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(walk(&path));
            } else {
                files.push(path);
            }
        }
    }
    files
}

#[tokio::test]
async fn test_flaky_host_succeeds_on_third_attempt() {
    let temp = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(Reply::ok("image/png", png_bytes(10, 10, 4096, 0)))
        .then(Reply::status(503))
        .then(Reply::Fail(TransportError::Timeout))
        .shared();

    let fetcher = Fetcher::new(transport.clone(), options(temp.path()));
    let outcome = fetcher.fetch(URL, &identifier()).await.unwrap();

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(transport.get_count(), 3);
    assert_eq!(outcome.byte_size, 4096);
    assert_eq!(outcome.extension.as_deref(), Some("png"));

    let stored = outcome.stored_path.unwrap();
    assert!(stored.exists());
    assert_eq!(
        stored,
        temp.path().join("outros").join(format!("cosmetic_{}.png", ID_A))
    );
}

#[tokio::test]
async fn test_retry_budget_exhausted() {
    let temp = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(Reply::status(503)).shared();

    let fetcher = Fetcher::new(transport.clone(), options(temp.path()));
    let outcome = fetcher.fetch(URL, &identifier()).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(transport.get_count(), 3);
    assert!(outcome.error.unwrap().contains("HTTP status 503"));
    assert!(outcome.stored_path.is_none());
}

#[tokio::test]
async fn test_small_file_is_rejected_and_removed() {
    let temp = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(Reply::ok("image/jpeg", vec![0xFF; 500])).shared();

    let fetcher = Fetcher::new(transport.clone(), options(temp.path()));
    let outcome = fetcher.fetch(URL, &identifier()).await.unwrap();

    assert!(!outcome.success);
    // Size failures are not transient
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.error.unwrap().contains("too small"));
    assert!(walk(temp.path()).is_empty());
}

#[tokio::test]
async fn test_interstitial_is_bypassed_once() {
    let temp = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(Reply::ok("image/png", png_bytes(64, 32, 2048, 1)))
        .then(Reply::ok("text/html; charset=utf-8", interstitial_page(ID_A)))
        .shared();

    let fetcher = Fetcher::new(transport.clone(), options(temp.path()));
    let outcome = fetcher.fetch(URL, &identifier()).await.unwrap();

    assert!(outcome.success, "{:?}", outcome.error);
    assert!(outcome.bypassed_interstitial);
    assert_eq!(outcome.attempts, 1);

    let requested = transport.requested();
    assert_eq!(requested.len(), 2);
    assert_eq!(
        requested[1],
        format!("https://drive.google.com/uc?export=download&confirm=t0k3n&id={}", ID_A)
    );
}

#[tokio::test]
async fn test_second_interstitial_is_not_chased() {
    let temp = TempDir::new().unwrap();
    let transport =
        ScriptedTransport::new(Reply::ok("text/html", interstitial_page(ID_A))).shared();

    let fetcher = Fetcher::new(transport.clone(), options(temp.path()));
    let outcome = fetcher.fetch(URL, &identifier()).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(transport.get_count(), 2);
    assert!(outcome.error.unwrap().contains("Interstitial"));
    assert_eq!(leftover_part_files(temp.path()), 0);
}

#[tokio::test]
async fn test_signature_beats_generic_content_type() {
    let temp = TempDir::new().unwrap();
    let mut gif = b"GIF89a".to_vec();
    gif.resize(3000, 0);
    let transport = ScriptedTransport::new(Reply::ok("application/octet-stream", gif)).shared();

    let fetcher = Fetcher::new(transport, options(temp.path()));
    let outcome = fetcher.fetch(URL, &identifier()).await.unwrap();

    assert_eq!(outcome.extension.as_deref(), Some("gif"));
    assert_eq!(
        outcome.filename.as_deref(),
        Some(format!("cosmetic_{}.gif", ID_A).as_str())
    );
}

#[tokio::test]
async fn test_unknown_payload_uses_default_extension() {
    let temp = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(Reply::Body {
        status: 200,
        content_type: None,
        body: vec![7u8; 2048],
    })
    .shared();

    let fetcher = Fetcher::new(transport, options(temp.path()));
    let outcome = fetcher.fetch(URL, &identifier()).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.extension.as_deref(), Some("jpg"));
}

#[tokio::test]
async fn test_file_prefix_drives_category() {
    let temp = TempDir::new().unwrap();
    let transport =
        ScriptedTransport::new(Reply::ok("image/png", png_bytes(1, 1, 2048, 0))).shared();

    let mut opts = options(temp.path());
    opts.file_prefix = "lipstick".to_string();

    let outcome = Fetcher::new(transport, opts)
        .fetch(URL, &identifier())
        .await
        .unwrap();

    assert_eq!(outcome.category.as_deref(), Some("batom"));
    assert!(temp.path().join("batom").is_dir());
}

#[tokio::test]
async fn test_unwritable_output_is_fatal() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    let transport: Arc<ScriptedTransport> =
        ScriptedTransport::new(Reply::ok("image/png", png_bytes(1, 1, 2048, 0))).shared();

    let fetcher = Fetcher::new(transport, options(&blocker));
    assert!(fetcher.fetch(URL, &identifier()).await.is_err());
}
