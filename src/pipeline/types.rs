//! Pipeline cycle types and errors

use crate::artifact::ArtifactError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The four steps of a cycle, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    GetPrice,
    GetMarketSnapshot,
    ComputeProbabilities,
    SynthesizeStrikeTable,
}

impl PipelineStep {
    pub const ALL: [PipelineStep; 4] = [
        PipelineStep::GetPrice,
        PipelineStep::GetMarketSnapshot,
        PipelineStep::ComputeProbabilities,
        PipelineStep::SynthesizeStrikeTable,
    ];

    /// Position within a cycle
    pub fn index(self) -> usize {
        match self {
            PipelineStep::GetPrice => 0,
            PipelineStep::GetMarketSnapshot => 1,
            PipelineStep::ComputeProbabilities => 2,
            PipelineStep::SynthesizeStrikeTable => 3,
        }
    }

    /// Metric label
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStep::GetPrice => "get_price",
            PipelineStep::GetMarketSnapshot => "get_market_snapshot",
            PipelineStep::ComputeProbabilities => "compute_probabilities",
            PipelineStep::SynthesizeStrikeTable => "synthesize_strike_table",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step-local failures. Each aborts the rest of its cycle only.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Price unavailable: {0}")]
    PriceUnavailable(String),
    #[error("Market snapshot unavailable: {0}")]
    MarketSnapshotUnavailable(String),
    #[error("TTC calculation failed: {0}")]
    TtcCalculation(String),
    #[error("Strike tier detection needs at least 2 distinct strikes, found {distinct}")]
    StrikeTierDetection { distinct: usize },
    #[error("Publish failed: {0}")]
    Publish(#[from] ArtifactError),
}

/// How a step ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed { error: String },
    /// Not run because an earlier step failed
    Skipped,
}

/// Result of one step within a cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub step: PipelineStep,
    #[serde(flatten)]
    pub status: StepStatus,
    pub duration_ms: f64,
}

impl StepOutcome {
    pub fn skipped(step: PipelineStep) -> Self {
        Self {
            step,
            status: StepStatus::Skipped,
            duration_ms: 0.0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Succeeded
    }
}

/// Record of one pipeline cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineCycle {
    pub index: u64,
    pub started_at: DateTime<Utc>,
    pub steps: [StepOutcome; 4],
    pub success: bool,
    pub duration_ms: f64,
    #[serde(skip)]
    pub duration: Duration,
}

impl PipelineCycle {
    /// First step that failed
    pub fn failed_step(&self) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|s| matches!(s.status, StepStatus::Failed { .. }))
    }

    /// Error message of the failed step
    pub fn error(&self) -> Option<&str> {
        self.failed_step().and_then(|s| match &s.status {
            StepStatus::Failed { error } => Some(error.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order() {
        for (i, step) in PipelineStep::ALL.iter().enumerate() {
            assert_eq!(step.index(), i);
        }
    }

    #[test]
    fn test_error_messages() {
        let err = PipelineError::StrikeTierDetection { distinct: 1 };
        assert_eq!(
            err.to_string(),
            "Strike tier detection needs at least 2 distinct strikes, found 1"
        );
        let err = PipelineError::PriceUnavailable("timed out after 3000 ms".into());
        assert_eq!(err.to_string(), "Price unavailable: timed out after 3000 ms");
    }

    #[test]
    fn test_failed_step_lookup() {
        let mut steps = PipelineStep::ALL.map(StepOutcome::skipped);
        steps[0].status = StepStatus::Succeeded;
        steps[1].status = StepStatus::Failed {
            error: "boom".to_string(),
        };
        let cycle = PipelineCycle {
            index: 1,
            started_at: Utc::now(),
            steps,
            success: false,
            duration_ms: 1.0,
            duration: Duration::from_millis(1),
        };
        assert_eq!(
            cycle.failed_step().map(|s| s.step),
            Some(PipelineStep::GetMarketSnapshot)
        );
        assert_eq!(cycle.error(), Some("boom"));
    }

    #[test]
    fn test_step_outcome_serialization() {
        let outcome = StepOutcome {
            step: PipelineStep::GetPrice,
            status: StepStatus::Failed {
                error: "stale".to_string(),
            },
            duration_ms: 2.5,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["step"], "get_price");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "stale");
        assert_eq!(json["durationMs"], 2.5);
    }
}
