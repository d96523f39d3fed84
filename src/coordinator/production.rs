//! Fixed-cadence production loop

use super::state::{CoordinatorPhase, CoordinatorState};
use crate::config::PipelineConfig;
use crate::pipeline::CyclePipeline;
use crate::telemetry::{
    increment_counter, record_cycle_duration, set_gauge, CounterMetric, GaugeMetric,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

struct RunHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<CyclePipeline>,
}

struct Lifecycle {
    /// Pipeline handed back by the last run, reused by the next start
    idle: Option<CyclePipeline>,
    run: Option<RunHandle>,
}

/// Drives a `CyclePipeline` on a fixed cadence with failure backoff.
///
/// `Stopped -> Running <-> Paused -> Stopped`. One background task runs the
/// loop and is the only writer of `CoordinatorState`.
pub struct ProductionCoordinator {
    settings: PipelineConfig,
    template: CyclePipeline,
    lifecycle: Mutex<Lifecycle>,
    state: Arc<watch::Sender<CoordinatorState>>,
}

impl ProductionCoordinator {
    pub fn new(pipeline: CyclePipeline, settings: PipelineConfig) -> Self {
        let (state, _) = watch::channel(CoordinatorState::default());
        Self {
            settings,
            lifecycle: Mutex::new(Lifecycle {
                idle: Some(pipeline.clone()),
                run: None,
            }),
            template: pipeline,
            state: Arc::new(state),
        }
    }

    pub fn settings(&self) -> &PipelineConfig {
        &self.settings
    }

    /// Start the loop. Returns false if it was already running.
    pub async fn start(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.run.is_some() {
            return false;
        }

        let pipeline = lifecycle
            .idle
            .take()
            .unwrap_or_else(|| self.template.clone());
        let (stop_tx, stop_rx) = watch::channel(false);

        self.state.send_modify(|s| {
            s.running = true;
            s.phase = CoordinatorPhase::Running;
        });
        info!(
            symbol = pipeline.symbol(),
            interval_ms = self.settings.interval_ms,
            "Production coordinator started"
        );

        let task = tokio::spawn(run_loop(
            pipeline,
            self.settings.clone(),
            Arc::clone(&self.state),
            stop_rx,
        ));
        lifecycle.run = Some(RunHandle { stop_tx, task });
        true
    }

    /// Stop the loop, letting an in-flight cycle finish. Returns false if it
    /// was not running.
    pub async fn stop(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(run) = lifecycle.run.take() else {
            return false;
        };

        run.stop_tx.send_replace(true);
        match run.task.await {
            Ok(pipeline) => lifecycle.idle = Some(pipeline),
            Err(e) => {
                error!(error = %e, "Production loop task failed");
                lifecycle.idle = None;
            }
        }

        self.state.send_modify(|s| {
            s.running = false;
            s.phase = CoordinatorPhase::Stopped;
        });
        info!("Production coordinator stopped");
        true
    }

    pub async fn restart(&self) {
        self.stop().await;
        self.start().await;
    }

    /// Current state snapshot
    pub fn status(&self) -> CoordinatorState {
        self.state.borrow().clone()
    }

    /// Running with fewer consecutive failures than the health threshold
    pub fn health(&self) -> bool {
        self.state
            .borrow()
            .is_healthy(self.settings.health_failure_threshold)
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state.subscribe()
    }
}

async fn run_loop(
    mut pipeline: CyclePipeline,
    settings: PipelineConfig,
    state: Arc<watch::Sender<CoordinatorState>>,
    mut stop_rx: watch::Receiver<bool>,
) -> CyclePipeline {
    let interval = settings.interval();
    let slow_threshold = settings.slow_cycle();

    loop {
        if *stop_rx.borrow() {
            break;
        }

        let index = state.borrow().current_cycle + 1;
        let cycle = pipeline.run_cycle(index).await;
        let duration = cycle.duration;

        record_cycle_duration(duration);
        if cycle.success {
            increment_counter(CounterMetric::CycleSucceeded);
            if duration > slow_threshold {
                increment_counter(CounterMetric::SlowCycle);
                warn!(cycle = index, duration_ms = cycle.duration_ms, "Slow pipeline cycle");
            } else {
                debug!(
                    cycle = index,
                    duration_ms = cycle.duration_ms,
                    bucket = ?pipeline.engine().last_bucket_used(),
                    "Pipeline cycle completed"
                );
            }
        } else {
            increment_counter(CounterMetric::CycleFailed);
            if let Some(failed) = cycle.failed_step() {
                warn!(
                    cycle = index,
                    step = %failed.step,
                    error = cycle.error().unwrap_or_default(),
                    "Pipeline cycle failed"
                );
            }
        }

        let bucket = pipeline.engine().last_bucket_used();
        let mut consecutive_failures = 0;
        state.send_modify(|s| {
            s.record_cycle(cycle, slow_threshold, settings.history_len);
            if bucket.is_some() {
                s.active_bucket = bucket;
            }
            consecutive_failures = s.consecutive_failures;
        });
        set_gauge(GaugeMetric::ConsecutiveFailures, f64::from(consecutive_failures));

        if consecutive_failures >= settings.max_consecutive_failures {
            let cooldown = settings.cooldown();
            let until = Utc::now()
                + chrono::Duration::from_std(cooldown).unwrap_or_else(|_| chrono::Duration::zero());
            warn!(
                consecutive_failures,
                cooldown_secs = cooldown.as_secs(),
                "Too many consecutive failures, pausing"
            );
            state.send_modify(|s| {
                s.phase = CoordinatorPhase::Paused { until };
                s.cooldowns += 1;
            });

            let stopped = sleep_or_stop(cooldown, &mut stop_rx).await;

            state.send_modify(|s| {
                s.consecutive_failures = 0;
                s.phase = CoordinatorPhase::Running;
            });
            set_gauge(GaugeMetric::ConsecutiveFailures, 0.0);
            if stopped {
                break;
            }
            info!("Cooldown over, resuming");
            continue;
        }

        if sleep_or_stop(interval.saturating_sub(duration), &mut stop_rx).await {
            break;
        }
    }

    pipeline
}

/// Sleep for `duration` unless stopped first. Returns true when stopped.
async fn sleep_or_stop(duration: Duration, stop_rx: &mut watch::Receiver<bool>) -> bool {
    if *stop_rx.borrow() {
        return true;
    }
    if duration.is_zero() {
        return false;
    }

    // A dropped stop sender also ends the loop
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = stop_rx.wait_for(|stop| *stop) => true,
    }
}
