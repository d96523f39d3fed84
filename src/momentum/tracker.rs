//! Rolling momentum tracker
//!
//! Keeps a price history just long enough to answer the longest horizon and
//! blends per-horizon percent changes into a single score.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;

use super::types::{Horizon, HorizonDelta, MomentumReading, DEFAULT_HORIZONS};

/// Weighted multi-horizon momentum over a rolling price window
#[derive(Debug, Clone)]
pub struct MomentumTracker {
    horizons: Vec<Horizon>,

    /// Price history with timestamps, oldest first
    prices: VecDeque<(DateTime<Utc>, Decimal)>,

    /// Longest horizon
    window: Duration,
}

impl MomentumTracker {
    /// Create a tracker for the given horizons
    pub fn new(horizons: Vec<Horizon>) -> Self {
        let longest = horizons.iter().map(|h| h.seconds).max().unwrap_or(0);
        Self {
            horizons,
            prices: VecDeque::new(),
            window: Duration::seconds(longest as i64),
        }
    }

    /// Create a tracker with the default 1m-30m horizons
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_HORIZONS.to_vec())
    }

    pub fn horizons(&self) -> &[Horizon] {
        &self.horizons
    }

    /// Number of retained samples
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Add a price observation. Out-of-order samples are ignored.
    pub fn update(&mut self, timestamp: DateTime<Utc>, price: Decimal) {
        if price <= Decimal::ZERO {
            return;
        }
        if let Some((last, _)) = self.prices.back() {
            if timestamp < *last {
                tracing::debug!(%timestamp, last = %last, "Ignoring out-of-order price");
                return;
            }
        }
        self.prices.push_back((timestamp, price));

        // Keep the newest sample at or before the cutoff as the anchor for
        // the longest horizon
        let cutoff = timestamp - self.window;
        while self.prices.len() >= 2 && self.prices[1].0 <= cutoff {
            self.prices.pop_front();
        }
    }

    /// Latest sample at or before `at`
    fn price_at(&self, at: DateTime<Utc>) -> Option<Decimal> {
        self.prices
            .iter()
            .rev()
            .find(|(ts, _)| *ts <= at)
            .map(|(_, price)| *price)
    }

    /// Blend the per-horizon changes as of `now`
    pub fn reading(&self, now: DateTime<Utc>) -> MomentumReading {
        let Some(current) = self.price_at(now) else {
            return MomentumReading::neutral(&self.horizons);
        };

        let deltas: Vec<HorizonDelta> = self
            .horizons
            .iter()
            .map(|h| {
                let past = self.price_at(now - Duration::seconds(h.seconds as i64));
                let delta_pct = past
                    .filter(|p| !p.is_zero())
                    .and_then(|p| ((current - p) / p * dec!(100)).to_f64());
                HorizonDelta {
                    horizon_seconds: h.seconds,
                    delta_pct,
                }
            })
            .collect();

        let weighted_score = self
            .horizons
            .iter()
            .zip(&deltas)
            .map(|(h, d)| h.weight * d.delta_pct.unwrap_or(0.0))
            .sum();

        MomentumReading {
            weighted_score,
            deltas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_tracker_is_neutral() {
        let tracker = MomentumTracker::with_defaults();
        let reading = tracker.reading(t0());
        assert_eq!(reading.weighted_score, 0.0);
        assert_eq!(reading.deltas.len(), 6);
    }

    #[test]
    fn test_single_horizon_delta() {
        let mut tracker = MomentumTracker::new(vec![Horizon::new(60, 1.0)]);
        tracker.update(t0(), dec!(50000));
        tracker.update(t0() + Duration::seconds(60), dec!(50050));

        let reading = tracker.reading(t0() + Duration::seconds(60));
        assert!((reading.weighted_score - 0.1).abs() < 1e-9);
        assert_eq!(reading.deltas[0].delta_pct, Some(0.1));
    }

    #[test]
    fn test_missing_horizons_contribute_nothing() {
        let mut tracker = MomentumTracker::with_defaults();
        tracker.update(t0(), dec!(50000));
        tracker.update(t0() + Duration::seconds(120), dec!(50100));

        let reading = tracker.reading(t0() + Duration::seconds(120));
        // 60s and 120s horizons both anchor at t0: +0.2%
        assert_eq!(reading.deltas[0].delta_pct, Some(0.2));
        assert_eq!(reading.deltas[1].delta_pct, Some(0.2));
        assert_eq!(reading.deltas[2].delta_pct, None);
        assert!((reading.weighted_score - 0.2 * (0.30 + 0.25)).abs() < 1e-9);
    }

    #[test]
    fn test_negative_momentum_bucket() {
        let mut tracker = MomentumTracker::new(vec![Horizon::new(60, 1.0)]);
        tracker.update(t0(), dec!(50000));
        tracker.update(t0() + Duration::seconds(60), dec!(49975));

        let reading = tracker.reading(t0() + Duration::seconds(60));
        assert_eq!(reading.bucket().value(), -5);
    }

    #[test]
    fn test_window_pruning_keeps_anchor() {
        let mut tracker = MomentumTracker::new(vec![Horizon::new(60, 1.0)]);
        for i in 0..300 {
            tracker.update(t0() + Duration::seconds(i), dec!(50000));
        }
        // 60s window plus the anchor sample
        assert_eq!(tracker.len(), 61);

        let now = t0() + Duration::seconds(299);
        assert_eq!(tracker.reading(now).deltas[0].delta_pct, Some(0.0));
    }

    #[test]
    fn test_out_of_order_and_invalid_ignored() {
        let mut tracker = MomentumTracker::with_defaults();
        tracker.update(t0() + Duration::seconds(10), dec!(50000));
        tracker.update(t0(), dec!(1));
        tracker.update(t0() + Duration::seconds(20), dec!(0));
        assert_eq!(tracker.len(), 1);
    }
}
