//! End-to-end integration tests

use crate::common::{snapshot, write_fingerprints, FixedPriceFeed};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use strike_engine::artifact::{
    ArtifactRepository, FileArtifactRepository, LiveProbabilities, StrikeTableSnapshot,
};
use strike_engine::audit::{ParquetReader, ProbabilityRecorder, RecorderConfig};
use strike_engine::config::{Config, PipelineConfig};
use strike_engine::coordinator::ProductionCoordinator;
use strike_engine::fingerprint::CsvFingerprintStore;
use strike_engine::market::FileSnapshotFeed;
use strike_engine::momentum::MomentumTracker;
use strike_engine::pipeline::{CyclePipeline, PipelineDeps};
use strike_engine::probability::ProbabilityEngine;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

#[test]
fn test_config_example_parses() {
    let config = Config::from_toml(include_str!("../../config.toml.example")).unwrap();
    assert_ok!(config.validate());
    assert_eq!(config.market.symbol, "btc");
    assert_eq!(config.pipeline.interval_ms, 1000);
}

#[test]
fn test_config_rejects_zero_interval() {
    let mut config = Config::from_toml(include_str!("../../config.toml.example")).unwrap();
    config.pipeline.interval_ms = 0;
    assert_err!(config.validate());
}

#[tokio::test]
async fn test_file_backed_production_flow() {
    let root = TempDir::new().unwrap();
    let fingerprints = root.path().join("fingerprints");
    let artifacts_dir = root.path().join("artifacts");
    let audit_dir = root.path().join("audit");

    write_fingerprints(&fingerprints, "btc", &[-5, 0, 5]);
    let venue = root.path().join("btc_snapshot.json");
    std::fs::write(
        &venue,
        serde_json::to_string(&snapshot(49_000, 250, 9)).unwrap(),
    )
    .unwrap();

    let engine = ProbabilityEngine::load(&CsvFingerprintStore::new(&fingerprints), "btc").unwrap();
    let recorder = ProbabilityRecorder::new(RecorderConfig {
        output_dir: audit_dir.clone(),
        ..Default::default()
    });
    let artifacts = Arc::new(FileArtifactRepository::new(&artifacts_dir));
    let template = root.path().join("{symbol}_snapshot.json");

    let deps = PipelineDeps::new(
        Arc::new(FixedPriceFeed::new(dec!(50100))),
        Arc::new(FileSnapshotFeed::new(template.to_string_lossy())),
        artifacts.clone(),
    )
    .with_recorder(recorder.clone());

    let settings = PipelineConfig {
        interval_ms: 50,
        ..Default::default()
    };
    let pipeline = CyclePipeline::new(engine, MomentumTracker::with_defaults(), deps, &settings);
    let coordinator = ProductionCoordinator::new(pipeline, settings);

    let mut status = coordinator.subscribe();
    coordinator.start().await;
    tokio::time::timeout(
        Duration::from_secs(10),
        status.wait_for(|s| s.successful_cycles >= 3),
    )
    .await
    .expect("three cycles within 10s")
    .unwrap();
    coordinator.stop().await;
    recorder.flush().await;

    let state = coordinator.status();
    assert!(!state.running);
    assert_eq!(state.failed_cycles, 0);

    // Published documents are plain camelCase JSON on disk
    let raw = std::fs::read_to_string(artifacts.strike_table_path("btc")).unwrap();
    let table: StrikeTableSnapshot = serde_json::from_str(&raw).unwrap();
    assert_eq!(table.current_price, dec!(50100));
    assert_eq!(table.rows.len(), 9);
    assert!(raw.contains("\"strikeTierSpacing\""));

    let raw = std::fs::read_to_string(artifacts.live_probabilities_path("btc")).unwrap();
    let live: LiveProbabilities = serde_json::from_str(&raw).unwrap();
    assert_eq!(live.base_strike, dec!(50000));
    assert_eq!(live.probabilities.len(), live.strikes.len());

    let read_back = assert_ok!(artifacts.strike_table("btc").await).unwrap();
    assert_eq!(assert_ok!(artifacts.strike_table("eth").await), None);
    assert_eq!(read_back.event_id, table.event_id);

    // Audit trail landed in Parquet
    let files: Vec<_> = std::fs::read_dir(&audit_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|x| x == "parquet").unwrap_or(false))
        .collect();
    assert!(!files.is_empty());

    let records: usize = files
        .iter()
        .map(|p| ParquetReader::new(p.clone()).read_probabilities().unwrap().len())
        .sum();
    assert!(records >= 3 * live.strikes.len());
    assert_eq!(recorder.stats().await.records_written as usize, records);
}
