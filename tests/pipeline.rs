//! Pipeline Integration Tests
//!
//! Full download runs through the orchestrator followed by the separate
//! dedup pass.

mod common;

use std::time::Duration;

use common::{png_bytes, view_link, Reply, ScriptedTransport, ID_A, ID_B, ID_C};
use drivecat::config::ResolvedConfig;
use drivecat::core::{Orchestrator, RetryPolicy};
use drivecat::library::{run_dedup, CatalogLabels, OutputStore};
use tempfile::TempDir;

fn test_config(temp: &TempDir) -> ResolvedConfig {
    let mut config = ResolvedConfig::with_home(temp.path().join("home"));
    config.output = temp.path().join("out");
    config.retry = RetryPolicy::immediate(3);
    config.fetch.item_delay_ms = 0;
    config
}

fn labels(config: &ResolvedConfig) -> CatalogLabels<'_> {
    CatalogLabels {
        name: &config.catalog.name,
        description: &config.catalog.description,
        display_prefix: &config.catalog.display_prefix,
    }
}

#[tokio::test]
async fn test_end_to_end_partial_failure() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let transport =
        ScriptedTransport::new(Reply::ok("image/png", png_bytes(100, 50, 4096, 0))).shared();

    let references = vec![
        view_link(ID_A),
        "https://example.com/not-a-drive-link".to_string(),
        view_link(ID_B),
    ];

    let orchestrator = Orchestrator::new(&config, transport.clone());
    let metadata = orchestrator.run(&references).await.unwrap();

    assert_eq!(metadata.summary.total, 3);
    assert_eq!(metadata.summary.successful, 2);
    assert_eq!(metadata.summary.failed, 1);
    assert_eq!(metadata.entries.len(), 2);
    assert_eq!(metadata.errors.len(), 1);
    assert!(metadata.finished_at.is_some());
    // The malformed link never reached the transport
    assert_eq!(transport.get_count(), 2);

    // Entries keep input order
    assert_eq!(metadata.entries[0].identifier.as_str(), ID_A);
    assert_eq!(metadata.entries[1].identifier.as_str(), ID_B);
    assert_eq!(
        metadata.entries[0].web_path,
        format!("/images/cosmeticos/outros/cosmetic_{}.png", ID_A)
    );

    let store = OutputStore::new(config.output.clone());
    let catalog = store.load_catalog().unwrap().unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.metadata.total_products, 2);
    let ids: Vec<_> = catalog.products().iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec!["item_001", "item_002"]);

    assert_eq!(store.load_metadata().unwrap(), Some(metadata));
    assert!(store.guide_path().exists());

    // Category directories exist up front, even empty ones
    assert!(config.output.join("batom").is_dir());
    assert!(config.output.join("outros").is_dir());
}

#[tokio::test]
async fn test_rerun_is_safe() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let transport =
        ScriptedTransport::new(Reply::ok("image/png", png_bytes(10, 10, 2048, 0))).shared();
    let references = vec![view_link(ID_A)];

    let orchestrator = Orchestrator::new(&config, transport);
    let first = orchestrator.run(&references).await.unwrap();
    let second = orchestrator.run(&references).await.unwrap();

    assert_eq!(first.entries[0].web_path, second.entries[0].web_path);
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(second.summary.successful, 1);
}

#[tokio::test]
async fn test_dedup_finds_identical_files() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let same = png_bytes(320, 240, 4096, 9);

    let transport = ScriptedTransport::new(Reply::ok("image/png", same.clone()))
        .route(ID_C, Reply::ok("image/png", png_bytes(320, 240, 4096, 8)))
        .shared();

    let references = vec![view_link(ID_A), view_link(ID_B), view_link(ID_C)];
    Orchestrator::new(&config, transport)
        .run(&references)
        .await
        .unwrap();

    let store = OutputStore::new(config.output.clone());
    let report = run_dedup(&store, &labels(&config)).await.unwrap();

    assert_eq!(report.analyzed, 3);
    assert!(report.missing.is_empty());
    assert_eq!(report.clusters.len(), 1);
    assert_eq!(report.clusters[0].count, 2);
    assert!(report.clusters[0].files[0].contains(ID_A));
    assert!(report.clusters[0].files[1].contains(ID_B));

    let metadata = store.load_metadata().unwrap().unwrap();
    assert!(metadata.deduplicated_at.is_some());
    assert_eq!(metadata.duplicates.len(), 1);
    let dims = metadata.entries[2].dimensions.unwrap();
    assert_eq!((dims.width, dims.height), (320, 240));

    let catalog = store.load_catalog().unwrap().unwrap();
    assert_eq!(catalog.metadata.duplicate_groups, 1);
    assert!(catalog.products().iter().all(|p| p.hash.is_some()));

    // A second pass gives the same clusters
    let again = run_dedup(&store, &labels(&config)).await.unwrap();
    assert_eq!(again.clusters, report.clusters);
}

#[tokio::test]
async fn test_one_byte_difference_is_not_a_duplicate() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let mut other = png_bytes(8, 8, 2048, 0);
    *other.last_mut().unwrap() = 1;

    let transport = ScriptedTransport::new(Reply::ok("image/png", png_bytes(8, 8, 2048, 0)))
        .route(ID_B, Reply::ok("image/png", other))
        .shared();

    Orchestrator::new(&config, transport)
        .run(&[view_link(ID_A), view_link(ID_B)])
        .await
        .unwrap();

    let store = OutputStore::new(config.output.clone());
    let report = run_dedup(&store, &labels(&config)).await.unwrap();
    assert_eq!(report.analyzed, 2);
    assert!(report.clusters.is_empty());
}

#[tokio::test]
async fn test_dedup_skips_missing_files() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let transport =
        ScriptedTransport::new(Reply::ok("image/png", png_bytes(8, 8, 2048, 0))).shared();

    let metadata = Orchestrator::new(&config, transport)
        .run(&[view_link(ID_A), view_link(ID_B)])
        .await
        .unwrap();

    std::fs::remove_file(config.output.join(metadata.entries[0].relative_path())).unwrap();

    let store = OutputStore::new(config.output.clone());
    let report = run_dedup(&store, &labels(&config)).await.unwrap();
    assert_eq!(report.analyzed, 1);
    assert_eq!(report.missing.len(), 1);
    assert!(report.clusters.is_empty());
}

#[tokio::test]
async fn test_dedup_without_a_run_fails() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let store = OutputStore::new(config.output.clone());

    assert!(run_dedup(&store, &labels(&config)).await.is_err());
}

#[tokio::test]
async fn test_item_delay_is_applied_between_items() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let transport =
        ScriptedTransport::new(Reply::ok("image/png", png_bytes(8, 8, 2048, 0))).shared();

    let orchestrator =
        Orchestrator::new(&config, transport).with_item_delay(Duration::from_millis(30));

    let started = std::time::Instant::now();
    orchestrator
        .run(&[view_link(ID_A), view_link(ID_B), view_link(ID_C)])
        .await
        .unwrap();

    // Two pauses for three items
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn test_skipped_items_do_not_pause() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let transport =
        ScriptedTransport::new(Reply::ok("image/png", png_bytes(8, 8, 2048, 0))).shared();

    let orchestrator =
        Orchestrator::new(&config, transport).with_item_delay(Duration::from_millis(300));

    let started = std::time::Instant::now();
    let metadata = orchestrator
        .run(&[
            "not a link".to_string(),
            view_link(ID_A),
            "still not a link".to_string(),
            "https://example.com/nope".to_string(),
            view_link(ID_B),
        ])
        .await
        .unwrap();

    assert_eq!(metadata.summary.failed, 3);
    assert_eq!(metadata.summary.successful, 2);
    // One pause between the two downloads, none around the malformed lines
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(300), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(900), "{:?}", elapsed);
}
