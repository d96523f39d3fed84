//! Coordinator cadence, failure handling and backoff

use crate::common::{snapshot, write_fingerprints, FixedPriceFeed, SwitchableSnapshotFeed};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use strike_engine::artifact::MemoryArtifactRepository;
use strike_engine::config::PipelineConfig;
use strike_engine::coordinator::{CoordinatorPhase, ProductionCoordinator};
use strike_engine::fingerprint::CsvFingerprintStore;
use strike_engine::momentum::MomentumTracker;
use strike_engine::pipeline::{CyclePipeline, PipelineDeps, PipelineStep};
use strike_engine::probability::ProbabilityEngine;
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    snapshots: Arc<SwitchableSnapshotFeed>,
    artifacts: Arc<MemoryArtifactRepository>,
    coordinator: ProductionCoordinator,
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    write_fingerprints(dir.path(), "btc", &[-3, 0, 3]);
    let engine = ProbabilityEngine::load(&CsvFingerprintStore::new(dir.path()), "btc").unwrap();

    let snapshots = Arc::new(SwitchableSnapshotFeed::new(snapshot(49_000, 250, 9)));
    let artifacts = Arc::new(MemoryArtifactRepository::new());
    let deps = PipelineDeps::new(
        Arc::new(FixedPriceFeed::new(dec!(50100))),
        snapshots.clone(),
        artifacts.clone(),
    );

    let settings = PipelineConfig::default();
    let pipeline = CyclePipeline::new(engine, MomentumTracker::with_defaults(), deps, &settings);

    Harness {
        _dir: dir,
        snapshots,
        artifacts,
        coordinator: ProductionCoordinator::new(pipeline, settings),
    }
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_single_strike_snapshot_aborts_cycle() {
    let h = harness();
    h.coordinator.start().await;
    advance(500).await;

    let published = h.artifacts.latest_strike_table().unwrap();
    assert_eq!(h.coordinator.status().successful_cycles, 1);

    h.snapshots.set(snapshot(50_000, 250, 1));
    advance(1000).await;

    let status = h.coordinator.status();
    assert_eq!(status.current_cycle, 2);
    assert_eq!(status.consecutive_failures, 1);
    let failed = status.last_cycle().unwrap();
    assert!(!failed.success);
    assert_eq!(
        failed.failed_step().map(|s| s.step),
        Some(PipelineStep::GetMarketSnapshot)
    );

    let current = h.artifacts.latest_strike_table().unwrap();
    assert_eq!(current.last_updated, published.last_updated);
    assert_eq!(current.rows, published.rows);

    h.coordinator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_pause_after_five_failures_then_resume() {
    let h = harness();
    h.snapshots.set(snapshot(50_000, 250, 1));

    h.coordinator.start().await;
    advance(4500).await;

    let status = h.coordinator.status();
    assert_eq!(status.consecutive_failures, 5);
    assert!(matches!(status.phase, CoordinatorPhase::Paused { .. }));
    let calls_at_pause = h.snapshots.calls();
    assert_eq!(calls_at_pause, 5);

    // Probe the pause window: nothing runs
    for _ in 0..9 {
        advance(1000).await;
        assert_eq!(h.snapshots.calls(), calls_at_pause);
        assert_eq!(h.coordinator.status().current_cycle, 5);
    }

    h.snapshots.set(snapshot(49_000, 250, 9));
    advance(1000).await;

    let status = h.coordinator.status();
    assert_eq!(status.phase, CoordinatorPhase::Running);
    assert_eq!(status.current_cycle, 6);
    assert!(status.last_cycle().unwrap().success);
    assert_eq!(status.consecutive_failures, 0);
    assert!(h.coordinator.health());
    assert!(h.artifacts.latest_strike_table().is_some());

    h.coordinator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_health_degrades_before_pause() {
    let h = harness();
    h.snapshots.set(snapshot(50_000, 250, 1));

    h.coordinator.start().await;
    advance(500).await;
    assert!(h.coordinator.health());

    advance(1000).await;
    assert!(h.coordinator.health());

    // Third failure in a row
    advance(1000).await;
    assert_eq!(h.coordinator.status().consecutive_failures, 3);
    assert!(!h.coordinator.health());

    h.coordinator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_observe_cycles() {
    let h = harness();
    let mut rx = h.coordinator.subscribe();

    h.coordinator.start().await;
    let state = tokio::time::timeout(
        Duration::from_secs(10),
        rx.wait_for(|s| s.successful_cycles >= 3),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();

    assert!(state.running);
    assert!(state.active_bucket.is_some());
    h.coordinator.stop().await;
}
