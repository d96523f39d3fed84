//! Run command implementation

use crate::artifact::{ArtifactRepository, FileArtifactRepository, MemoryArtifactRepository};
use crate::audit::{ProbabilityRecorder, RecorderConfig};
use crate::config::{ArtifactBackend, Config, SnapshotSource};
use crate::coordinator::ProductionCoordinator;
use crate::feed::BinanceFeed;
use crate::market::{FileSnapshotFeed, HttpSnapshotConfig, HttpSnapshotFeed, MarketSnapshotFeed};
use crate::momentum::MomentumTracker;
use crate::notify::{HttpNotifier, Notifier};
use crate::pipeline::{CyclePipeline, PipelineDeps};
use anyhow::Context;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Seconds between status log lines
    #[arg(long, default_value_t = 30)]
    pub status_interval_secs: u64,

    /// Seconds to wait for the first price tick before starting
    #[arg(long, default_value_t = 10)]
    pub warmup_secs: u64,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let symbol = config.market.symbol.to_lowercase();

        let engine = super::load_engine(config).context("Cannot start without fingerprints")?;
        info!(
            symbol = %symbol,
            buckets = engine.available_buckets().len(),
            active = %engine.active_bucket(),
            "Fingerprints loaded"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let price_feed = build_price_feed(config)?;
        let feed_handle = price_feed.start(shutdown_rx.clone());
        self.wait_for_first_tick(&price_feed).await;

        let recorder = config
            .audit
            .enabled
            .then(|| ProbabilityRecorder::new(RecorderConfig::from(&config.audit)));

        let mut deps = PipelineDeps::new(
            price_feed.clone(),
            build_snapshot_feed(config)?,
            build_artifacts(config),
        );
        if !config.notify.urls.is_empty() {
            let notifier: Arc<dyn Notifier> = Arc::new(HttpNotifier::new(
                config.notify.urls.clone(),
                config.notify.timeout(),
            )?);
            deps = deps.with_notifier(notifier);
        }
        if let Some(recorder) = recorder.clone() {
            deps = deps.with_recorder(recorder);
        }

        let momentum = MomentumTracker::new(config.momentum.horizons()?);
        let pipeline = CyclePipeline::new(engine, momentum, deps, &config.pipeline);
        let coordinator = ProductionCoordinator::new(pipeline, config.pipeline.clone());
        coordinator.start().await;

        let mut status_timer =
            tokio::time::interval(Duration::from_secs(self.status_interval_secs.max(1)));
        status_timer.tick().await;

        loop {
            tokio::select! {
                _ = status_timer.tick() => {
                    let status = coordinator.status();
                    info!(
                        cycle = status.current_cycle,
                        successful = status.successful_cycles,
                        failed = status.failed_cycles,
                        consecutive_failures = status.consecutive_failures,
                        avg_ms = format!("{:.1}", status.average_cycle_duration_ms),
                        slow = status.slow_cycle_count,
                        healthy = coordinator.health(),
                        "Coordinator status"
                    );
                }
                res = tokio::signal::ctrl_c() => {
                    if let Err(e) = res {
                        warn!(error = %e, "Failed to listen for shutdown signal");
                    }
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        coordinator.stop().await;
        shutdown_tx.send_replace(true);

        if let Some(recorder) = recorder {
            recorder.flush().await;
        }
        if tokio::time::timeout(Duration::from_secs(5), feed_handle)
            .await
            .is_err()
        {
            warn!("Price feed did not shut down in time");
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// Returns whether a tick arrived within the warmup window
    async fn wait_for_first_tick(&self, feed: &BinanceFeed) -> bool {
        let mut ticks = feed.subscribe();
        let warmup = Duration::from_secs(self.warmup_secs);
        let received = tokio::time::timeout(warmup, ticks.wait_for(Option::is_some))
            .await
            .is_ok_and(|r| r.is_ok());

        if received {
            info!("First price tick received");
        } else {
            warn!(
                warmup_secs = self.warmup_secs,
                "No price tick yet, starting anyway"
            );
        }
        received
    }
}

fn build_price_feed(config: &Config) -> anyhow::Result<Arc<BinanceFeed>> {
    match config.feed.exchange.to_lowercase().as_str() {
        "binance" => {
            let mut feed = BinanceFeed::new(&config.feed.symbol)
                .with_max_staleness(config.feed.max_staleness());
            if let Some(url) = &config.feed.ws_url {
                feed = feed.with_ws_url(url);
            }
            Ok(Arc::new(feed))
        }
        other => anyhow::bail!("Unsupported exchange: {}", other),
    }
}

fn build_snapshot_feed(config: &Config) -> anyhow::Result<Arc<dyn MarketSnapshotFeed>> {
    match config.market.source {
        SnapshotSource::Http => {
            let url = config
                .market
                .url
                .clone()
                .context("market.url is required for the http snapshot source")?;
            let mut http = HttpSnapshotConfig::new(url);
            http.timeout = config.pipeline.step_timeout();
            Ok(Arc::new(HttpSnapshotFeed::new(http)?))
        }
        SnapshotSource::File => {
            let path = config
                .market
                .path
                .clone()
                .context("market.path is required for the file snapshot source")?;
            Ok(Arc::new(FileSnapshotFeed::new(path)))
        }
    }
}

fn build_artifacts(config: &Config) -> Arc<dyn ArtifactRepository> {
    match config.artifacts.backend {
        ArtifactBackend::File => Arc::new(FileArtifactRepository::new(&config.artifacts.dir)),
        ArtifactBackend::Memory => Arc::new(MemoryArtifactRepository::new()),
    }
}
