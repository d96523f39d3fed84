//! Strike probability estimation
//!
//! Answers "how likely is price to cross this strike before close" from the
//! fingerprint table of the current momentum bucket.

mod engine;
mod interpolate;
mod types;

pub use engine::ProbabilityEngine;
pub use interpolate::{interpolate_grid, GridSample};
pub use types::{ContractSide, StrikeProbability, StrikeSide};
