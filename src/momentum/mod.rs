//! Momentum tracking module
//!
//! Turns the recent price history into a weighted momentum score. The score
//! selects which fingerprint bucket the probability engine answers from.

mod tracker;
mod types;

pub use tracker::MomentumTracker;
pub use types::{Horizon, HorizonDelta, MomentumReading, DEFAULT_HORIZONS};
