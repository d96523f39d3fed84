//! Shared pipeline helpers
//!
//! Strike tier detection, TTC, the probability ladder, and edge diffs.

use super::types::PipelineError;
use crate::probability::StrikeSide;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// Spacing between the two lowest distinct strikes
pub fn detect_strike_tier_spacing(strikes: &[Decimal]) -> Result<Decimal, PipelineError> {
    let mut unique: Vec<Decimal> = strikes.to_vec();
    unique.sort();
    unique.dedup();

    match unique.as_slice() {
        [first, second, ..] => Ok(second - first),
        _ => Err(PipelineError::StrikeTierDetection {
            distinct: unique.len(),
        }),
    }
}

/// Whole seconds from `now` until `close`, floored at zero
pub fn calculate_ttc(close: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (close - now).num_seconds().max(0)
}

/// Price rounded to the nearest multiple of `step`, halves rounding up
pub fn base_strike(price: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return price;
    }
    (price / step).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * step
}

/// `2 * levels + 1` strikes centred on the base strike, ascending.
/// Non-positive strikes are dropped.
pub fn build_strike_ladder(price: Decimal, step: Decimal, levels: u32) -> Vec<Decimal> {
    let base = base_strike(price, step);
    let levels = i64::from(levels);
    (-levels..=levels)
        .map(|k| base + Decimal::from(k) * step)
        .filter(|strike| *strike > Decimal::ZERO)
        .collect()
}

/// Model edge on each side, in cents, given the active side's probability.
///
/// Above the price NO is active, so `probability` is the NO win chance;
/// below it YES is active.
pub fn edge_diffs(
    side: StrikeSide,
    probability: f64,
    yes_ask: Option<u32>,
    no_ask: Option<u32>,
) -> (Option<f64>, Option<f64>) {
    let (yes_prob, no_prob) = match side {
        StrikeSide::Above => (100.0 - probability, probability),
        StrikeSide::Below => (probability, 100.0 - probability),
    };
    (
        yes_ask.map(|ask| yes_prob - f64::from(ask)),
        no_ask.map(|ask| no_prob - f64::from(ask)),
    )
}
