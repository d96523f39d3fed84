//! Coordinator state published to readers

use crate::fingerprint::MomentumBucket;
use crate::pipeline::PipelineCycle;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Lifecycle phase of the production loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum CoordinatorPhase {
    #[default]
    Stopped,
    Running,
    /// Cooling down after too many consecutive failures
    Paused { until: DateTime<Utc> },
}

/// Snapshot of the loop's statistics
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorState {
    pub running: bool,
    #[serde(flatten)]
    pub phase: CoordinatorPhase,
    /// Index of the most recent cycle
    pub current_cycle: u64,
    pub consecutive_failures: u32,
    pub successful_cycles: u64,
    pub failed_cycles: u64,
    /// Mean duration of successful cycles
    pub average_cycle_duration_ms: f64,
    pub slow_cycle_count: u64,
    pub cooldowns: u64,
    pub last_success_timestamp: Option<DateTime<Utc>>,
    pub active_bucket: Option<MomentumBucket>,
    pub recent_cycles: VecDeque<PipelineCycle>,
}

impl CoordinatorState {
    pub fn is_paused(&self) -> bool {
        matches!(self.phase, CoordinatorPhase::Paused { .. })
    }

    /// Running with fewer than `failure_threshold` failures in a row
    pub fn is_healthy(&self, failure_threshold: u32) -> bool {
        self.running && self.consecutive_failures < failure_threshold
    }

    pub fn last_cycle(&self) -> Option<&PipelineCycle> {
        self.recent_cycles.back()
    }

    /// Fold a finished cycle into the statistics
    pub fn record_cycle(
        &mut self,
        cycle: PipelineCycle,
        slow_threshold: Duration,
        history_len: usize,
    ) {
        self.current_cycle = cycle.index;

        if cycle.success {
            self.consecutive_failures = 0;
            self.successful_cycles += 1;
            let n = self.successful_cycles as f64;
            self.average_cycle_duration_ms += (cycle.duration_ms - self.average_cycle_duration_ms) / n;
            if cycle.duration > slow_threshold {
                self.slow_cycle_count += 1;
            }
            self.last_success_timestamp = Some(cycle.started_at);
        } else {
            self.consecutive_failures += 1;
            self.failed_cycles += 1;
        }

        self.recent_cycles.push_back(cycle);
        while self.recent_cycles.len() > history_len {
            self.recent_cycles.pop_front();
        }
    }
}
