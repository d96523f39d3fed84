//! One pass through the four pipeline steps

use super::steps::{self, LadderSettings};
use super::types::{PipelineCycle, PipelineError, PipelineStep, StepOutcome, StepStatus};
use crate::artifact::{ArtifactRepository, LiveProbabilities, StrikeTableSnapshot};
use crate::audit::ProbabilityRecorder;
use crate::config::PipelineConfig;
use crate::feed::{PriceFeed, PriceTick};
use crate::market::{MarketSnapshot, MarketSnapshotFeed};
use crate::momentum::{MomentumReading, MomentumTracker};
use crate::notify::{Notifier, PublishEvent};
use crate::probability::ProbabilityEngine;
use crate::telemetry::{record_step_failure, set_gauge, GaugeMetric};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Collaborators a pipeline talks to
#[derive(Clone)]
pub struct PipelineDeps {
    pub price_feed: Arc<dyn PriceFeed>,
    pub snapshot_feed: Arc<dyn MarketSnapshotFeed>,
    pub artifacts: Arc<dyn ArtifactRepository>,
    pub notifier: Option<Arc<dyn Notifier>>,
    pub recorder: Option<ProbabilityRecorder>,
}

impl PipelineDeps {
    pub fn new(
        price_feed: Arc<dyn PriceFeed>,
        snapshot_feed: Arc<dyn MarketSnapshotFeed>,
        artifacts: Arc<dyn ArtifactRepository>,
    ) -> Self {
        Self {
            price_feed,
            snapshot_feed,
            artifacts,
            notifier: None,
            recorder: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_recorder(mut self, recorder: ProbabilityRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }
}

/// Runs cycles for one symbol. Owns its engine and momentum history.
#[derive(Clone)]
pub struct CyclePipeline {
    symbol: String,
    step_timeout: Duration,
    ladder: LadderSettings,
    engine: ProbabilityEngine,
    momentum: MomentumTracker,
    deps: PipelineDeps,
    /// Last strike table this pipeline published
    published_table: Option<StrikeTableSnapshot>,
}

impl CyclePipeline {
    pub fn new(
        engine: ProbabilityEngine,
        momentum: MomentumTracker,
        deps: PipelineDeps,
        settings: &PipelineConfig,
    ) -> Self {
        Self {
            symbol: engine.symbol().to_string(),
            step_timeout: settings.step_timeout(),
            ladder: LadderSettings {
                step: settings.strike_step,
                levels: settings.strike_levels,
            },
            engine,
            momentum,
            deps,
            published_table: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn engine(&self) -> &ProbabilityEngine {
        &self.engine
    }

    pub fn momentum(&self) -> &MomentumTracker {
        &self.momentum
    }

    /// Run all four steps, stopping at the first failure
    pub async fn run_cycle(&mut self, index: u64) -> PipelineCycle {
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut outcomes = PipelineStep::ALL.map(StepOutcome::skipped);

        let success = self.execute(index, &mut outcomes).await.is_ok();
        let duration = clock.elapsed();

        PipelineCycle {
            index,
            started_at,
            steps: outcomes,
            success,
            duration_ms: duration.as_secs_f64() * 1000.0,
            duration,
        }
    }

    async fn execute(
        &mut self,
        index: u64,
        outcomes: &mut [StepOutcome; 4],
    ) -> Result<(), PipelineError> {
        let tick = timed(
            outcomes,
            PipelineStep::GetPrice,
            steps::get_price(self.deps.price_feed.as_ref(), &self.symbol, self.step_timeout),
        )
        .await?;
        self.momentum.update(tick.timestamp, tick.price);

        let snapshot = timed(
            outcomes,
            PipelineStep::GetMarketSnapshot,
            steps::get_market_snapshot(
                self.deps.snapshot_feed.as_ref(),
                &self.symbol,
                self.step_timeout,
            ),
        )
        .await?;

        let (live, momentum) = timed(
            outcomes,
            PipelineStep::ComputeProbabilities,
            self.compute(&tick, &snapshot),
        )
        .await?;

        let table = timed(
            outcomes,
            PipelineStep::SynthesizeStrikeTable,
            self.synthesize_and_publish(&live, &snapshot, momentum),
        )
        .await?;

        self.after_publish(index, &live, &table).await;
        Ok(())
    }

    async fn compute(
        &mut self,
        tick: &PriceTick,
        snapshot: &MarketSnapshot,
    ) -> Result<(LiveProbabilities, MomentumReading), PipelineError> {
        let now = Utc::now();
        let momentum = self.momentum.reading(now);
        let live = steps::compute_probabilities(
            &mut self.engine,
            tick,
            snapshot,
            &momentum,
            self.ladder,
            now,
        )?;

        set_gauge(GaugeMetric::ActiveBucket, f64::from(live.momentum_bucket.value()));
        set_gauge(GaugeMetric::TtcSeconds, live.ttc_seconds as f64);
        Ok((live, momentum))
    }

    /// Publish the strike table, then the live probabilities. Nothing is
    /// written before both documents exist; if the second write fails the
    /// previous strike table is put back.
    async fn synthesize_and_publish(
        &mut self,
        live: &LiveProbabilities,
        snapshot: &MarketSnapshot,
        momentum: MomentumReading,
    ) -> Result<StrikeTableSnapshot, PipelineError> {
        let table = steps::synthesize_strike_table(live, snapshot, momentum, Utc::now());
        self.deps.artifacts.put_strike_table(&table).await?;

        if let Err(e) = self.deps.artifacts.put_live_probabilities(live).await {
            if let Some(previous) = &self.published_table {
                if let Err(restore) = self.deps.artifacts.put_strike_table(previous).await {
                    warn!(
                        symbol = %self.symbol,
                        error = %restore,
                        "Failed to restore previous strike table"
                    );
                }
            }
            return Err(e.into());
        }

        self.published_table = Some(table.clone());
        Ok(table)
    }

    /// Best-effort side effects of a published cycle
    async fn after_publish(
        &self,
        index: u64,
        live: &LiveProbabilities,
        table: &StrikeTableSnapshot,
    ) {
        if let Some(notifier) = &self.deps.notifier {
            notifier.notify(PublishEvent {
                symbol: table.symbol.clone(),
                cycle: index,
                event_id: table.event_id.clone(),
                fingerprint_id: table.fingerprint_id.clone(),
                rows: table.rows.len(),
                published_at: table.last_updated,
            });
        }
        if let Some(recorder) = &self.deps.recorder {
            recorder.record(live).await;
        }
    }
}

/// Await one step and record its outcome
async fn timed<T, F>(
    outcomes: &mut [StepOutcome; 4],
    step: PipelineStep,
    fut: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    let started = Instant::now();
    let result = fut.await;
    let status = match &result {
        Ok(_) => StepStatus::Succeeded,
        Err(e) => {
            record_step_failure(step.as_str());
            StepStatus::Failed {
                error: e.to_string(),
            }
        }
    };
    outcomes[step.index()] = StepOutcome {
        step,
        status,
        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
    };
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactError, MemoryArtifactRepository};
    use crate::pipeline::test_support::{
        sample_engine, sample_snapshot, RecordingNotifier, StaticPriceFeed, StaticSnapshotFeed,
    };
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory repository whose writes can be made to fail per document
    #[derive(Default)]
    struct FailingArtifacts {
        inner: MemoryArtifactRepository,
        fail_table: AtomicBool,
        fail_live: AtomicBool,
    }

    #[async_trait]
    impl ArtifactRepository for FailingArtifacts {
        async fn put_live_probabilities(
            &self,
            doc: &LiveProbabilities,
        ) -> Result<(), ArtifactError> {
            if self.fail_live.load(Ordering::SeqCst) {
                return Err(ArtifactError::Task("disk full".to_string()));
            }
            self.inner.put_live_probabilities(doc).await
        }

        async fn put_strike_table(&self, doc: &StrikeTableSnapshot) -> Result<(), ArtifactError> {
            if self.fail_table.load(Ordering::SeqCst) {
                return Err(ArtifactError::Task("disk full".to_string()));
            }
            self.inner.put_strike_table(doc).await
        }

        async fn live_probabilities(
            &self,
            symbol: &str,
        ) -> Result<Option<LiveProbabilities>, ArtifactError> {
            self.inner.live_probabilities(symbol).await
        }

        async fn strike_table(
            &self,
            symbol: &str,
        ) -> Result<Option<StrikeTableSnapshot>, ArtifactError> {
            self.inner.strike_table(symbol).await
        }
    }

    fn failing_pipeline(artifacts: Arc<FailingArtifacts>) -> (Arc<StaticPriceFeed>, CyclePipeline) {
        let price = Arc::new(StaticPriceFeed::new(Some(dec!(50100))));
        let snapshots = Arc::new(StaticSnapshotFeed::new(Some(sample_snapshot())));
        let deps = PipelineDeps::new(price.clone(), snapshots, artifacts);
        let pipeline = CyclePipeline::new(
            sample_engine(),
            MomentumTracker::with_defaults(),
            deps,
            &PipelineConfig::default(),
        );
        (price, pipeline)
    }

    struct Fixture {
        price: Arc<StaticPriceFeed>,
        snapshots: Arc<StaticSnapshotFeed>,
        artifacts: Arc<MemoryArtifactRepository>,
        notifier: Arc<RecordingNotifier>,
        pipeline: CyclePipeline,
    }

    fn fixture() -> Fixture {
        let price = Arc::new(StaticPriceFeed::new(Some(dec!(50100))));
        let snapshots = Arc::new(StaticSnapshotFeed::new(Some(sample_snapshot())));
        let artifacts = Arc::new(MemoryArtifactRepository::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let deps = PipelineDeps::new(price.clone(), snapshots.clone(), artifacts.clone())
            .with_notifier(notifier.clone());
        let pipeline = CyclePipeline::new(
            sample_engine(),
            MomentumTracker::with_defaults(),
            deps,
            &PipelineConfig::default(),
        );
        Fixture {
            price,
            snapshots,
            artifacts,
            notifier,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_successful_cycle_publishes() {
        let mut f = fixture();
        let cycle = f.pipeline.run_cycle(1).await;

        assert!(cycle.success);
        assert!(cycle.steps.iter().all(|s| s.is_success()));
        assert!(cycle.failed_step().is_none());

        let table = f.artifacts.latest_strike_table().unwrap();
        assert_eq!(table.current_price, dec!(50100));
        assert_eq!(table.rows.len(), 5);
        let live = f.artifacts.latest_live_probabilities().unwrap();
        assert_eq!(live.strikes.len(), 21);

        let events = f.notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].cycle, 1);
        assert_eq!(events[0].rows, 5);
        assert_eq!(f.pipeline.momentum().len(), 1);
    }

    #[tokio::test]
    async fn test_price_failure_short_circuits() {
        let mut f = fixture();
        f.price.set(None);

        let cycle = f.pipeline.run_cycle(1).await;
        assert!(!cycle.success);
        assert_eq!(
            cycle.failed_step().map(|s| s.step),
            Some(PipelineStep::GetPrice)
        );
        for outcome in &cycle.steps[1..] {
            assert_eq!(outcome.status, StepStatus::Skipped);
        }
        assert_eq!(f.snapshots.calls(), 0);
        assert!(f.artifacts.latest_strike_table().is_none());
        assert!(f.notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_artifacts() {
        let mut f = fixture();
        assert!(f.pipeline.run_cycle(1).await.success);
        let published = f.artifacts.latest_strike_table().unwrap();

        let mut broken = sample_snapshot();
        broken.markets.truncate(1);
        f.snapshots.set(Some(broken));

        let cycle = f.pipeline.run_cycle(2).await;
        assert!(!cycle.success);
        assert_eq!(
            cycle.failed_step().map(|s| s.step),
            Some(PipelineStep::GetMarketSnapshot)
        );
        assert_eq!(
            cycle.error(),
            Some("Strike tier detection needs at least 2 distinct strikes, found 1")
        );
        let still = f.artifacts.latest_strike_table().unwrap();
        assert_eq!(still.last_updated, published.last_updated);
    }

    #[tokio::test]
    async fn test_missing_close_fails_compute_step() {
        let mut f = fixture();
        let mut snapshot = sample_snapshot();
        snapshot.close_timestamp = None;
        f.snapshots.set(Some(snapshot));

        let cycle = f.pipeline.run_cycle(1).await;
        assert_eq!(
            cycle.failed_step().map(|s| s.step),
            Some(PipelineStep::ComputeProbabilities)
        );
        assert!(cycle.steps[0].is_success());
        assert!(cycle.steps[1].is_success());
        assert_eq!(cycle.steps[3].status, StepStatus::Skipped);
        assert!(f.artifacts.latest_live_probabilities().is_none());
    }

    #[tokio::test]
    async fn test_strike_table_write_failure_keeps_live_document() {
        let artifacts = Arc::new(FailingArtifacts::default());
        let (price, mut pipeline) = failing_pipeline(artifacts.clone());
        assert!(pipeline.run_cycle(1).await.success);
        let published = artifacts.inner.latest_live_probabilities().unwrap();

        price.set(Some(dec!(50600)));
        artifacts.fail_table.store(true, Ordering::SeqCst);
        let cycle = pipeline.run_cycle(2).await;

        assert!(!cycle.success);
        assert_eq!(
            cycle.failed_step().map(|s| s.step),
            Some(PipelineStep::SynthesizeStrikeTable)
        );
        let live = artifacts.inner.latest_live_probabilities().unwrap();
        assert_eq!(live.current_price, dec!(50100));
        assert_eq!(live.timestamp, published.timestamp);
    }

    #[tokio::test]
    async fn test_live_write_failure_restores_previous_table() {
        let artifacts = Arc::new(FailingArtifacts::default());
        let (price, mut pipeline) = failing_pipeline(artifacts.clone());
        assert!(pipeline.run_cycle(1).await.success);
        let published = artifacts.inner.latest_strike_table().unwrap();

        price.set(Some(dec!(50600)));
        artifacts.fail_live.store(true, Ordering::SeqCst);
        let cycle = pipeline.run_cycle(2).await;

        assert!(!cycle.success);
        assert_eq!(
            cycle.failed_step().map(|s| s.step),
            Some(PipelineStep::SynthesizeStrikeTable)
        );
        let table = artifacts.inner.latest_strike_table().unwrap();
        assert_eq!(table.current_price, dec!(50100));
        assert_eq!(table.last_updated, published.last_updated);
        assert_eq!(
            artifacts.inner.latest_live_probabilities().unwrap().current_price,
            dec!(50100)
        );
    }
}
