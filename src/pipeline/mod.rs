//! Production pipeline
//!
//! A cycle runs four dependent steps: get price, get market snapshot,
//! compute probabilities, synthesize strike table. The first failure aborts
//! the rest of the cycle; already published artifacts stay in place.

mod cycle;
mod helpers;
mod steps;
mod types;

pub use cycle::{CyclePipeline, PipelineDeps};
pub use helpers::{
    base_strike, build_strike_ladder, calculate_ttc, detect_strike_tier_spacing, edge_diffs,
};
pub use steps::{
    compute_probabilities, get_market_snapshot, get_price, synthesize_strike_table,
    LadderSettings,
};
pub use types::{PipelineCycle, PipelineError, PipelineStep, StepOutcome, StepStatus};
