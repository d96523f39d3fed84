//! Momentum-bucketed probability engine
//!
//! One engine serves one symbol. Every loaded table is kept behind an `Arc`
//! so clones share storage; the active bucket is per instance, which lets
//! each producer own its own engine without reloading tables.

use super::interpolate::{interpolate_grid, GridSample};
use super::types::{StrikeProbability, StrikeSide};
use crate::fingerprint::{
    FingerprintError, FingerprintStore, FingerprintTable, MomentumBucket, MoveDirection,
};
use crate::telemetry::{increment_counter, CounterMetric};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Fingerprint-backed strike probability engine
#[derive(Debug, Clone)]
pub struct ProbabilityEngine {
    symbol: String,
    tables: Arc<BTreeMap<MomentumBucket, Arc<FingerprintTable>>>,
    active_bucket: MomentumBucket,
    active: Arc<FingerprintTable>,
    last_bucket_used: Option<MomentumBucket>,
    fallback_count: u64,
}

impl ProbabilityEngine {
    /// Load every available table for `symbol`.
    ///
    /// Tables that fail to parse are skipped with an error log. Fails with
    /// `NoFingerprintData` when no table could be loaded.
    pub fn load(store: &dyn FingerprintStore, symbol: &str) -> Result<Self, FingerprintError> {
        let buckets = store.available_buckets(symbol)?;

        let mut tables = BTreeMap::new();
        for bucket in buckets {
            match store.load_table(symbol, bucket) {
                Ok(table) => {
                    tables.insert(bucket, table);
                }
                Err(e) => {
                    tracing::error!(symbol, bucket = %bucket, error = %e, "Skipping fingerprint table");
                }
            }
        }

        let engine = Self::from_tables(symbol, tables)?;
        tracing::info!(
            symbol,
            buckets = engine.tables.len(),
            active = %engine.active_bucket,
            "Loaded fingerprint tables"
        );
        Ok(engine)
    }

    /// Build an engine from already loaded tables.
    ///
    /// The initial active bucket is the one closest to neutral momentum.
    pub fn from_tables(
        symbol: impl Into<String>,
        tables: BTreeMap<MomentumBucket, FingerprintTable>,
    ) -> Result<Self, FingerprintError> {
        let symbol = symbol.into();
        let tables: BTreeMap<MomentumBucket, Arc<FingerprintTable>> = tables
            .into_iter()
            .map(|(bucket, table)| (bucket, Arc::new(table)))
            .collect();

        let active_bucket = nearest_bucket(&tables, MomentumBucket::ZERO)
            .ok_or_else(|| FingerprintError::NoFingerprintData {
                symbol: symbol.clone(),
            })?;
        let active = tables
            .get(&active_bucket)
            .cloned()
            .ok_or_else(|| FingerprintError::NoFingerprintData {
                symbol: symbol.clone(),
            })?;

        Ok(Self {
            symbol,
            tables: Arc::new(tables),
            active_bucket,
            active,
            last_bucket_used: None,
            fallback_count: 0,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Buckets with a loaded table, ascending
    pub fn available_buckets(&self) -> Vec<MomentumBucket> {
        self.tables.keys().copied().collect()
    }

    pub fn active_bucket(&self) -> MomentumBucket {
        self.active_bucket
    }

    pub fn active_table(&self) -> &FingerprintTable {
        &self.active
    }

    /// Identifier of the active table
    pub fn fingerprint_id(&self) -> &str {
        self.active.id()
    }

    /// Bucket used by the last `calculate_strike_probabilities` call
    pub fn last_bucket_used(&self) -> Option<MomentumBucket> {
        self.last_bucket_used
    }

    /// Number of direction lookups answered by the nearest sample
    pub fn fallback_count(&self) -> u64 {
        self.fallback_count
    }

    /// Activate the available bucket closest to the score's bucket.
    ///
    /// Equidistant candidates resolve to the lower bucket. The active table is
    /// only swapped when the bucket changes.
    pub fn select_bucket(&mut self, momentum_score: f64) -> MomentumBucket {
        let target = MomentumBucket::from_score(momentum_score);
        let Some(bucket) = nearest_bucket(&self.tables, target) else {
            return self.active_bucket;
        };

        if bucket != self.active_bucket {
            if let Some(table) = self.tables.get(&bucket) {
                tracing::debug!(
                    from = %self.active_bucket,
                    to = %bucket,
                    target = %target,
                    "Switching fingerprint bucket"
                );
                self.active = Arc::clone(table);
                self.active_bucket = bucket;
            }
        }
        self.active_bucket
    }

    /// Upward and downward hit rates for a move of `move_percent` within
    /// `ttc_seconds`, each in [0, 100]
    pub fn interpolate(&mut self, ttc_seconds: f64, move_percent: f64) -> (f64, f64) {
        let table = &self.active;
        let ttcs = table.ttc_seconds();
        let up = interpolate_grid(ttcs, table.grid(MoveDirection::Up), ttc_seconds, move_percent);
        let down = interpolate_grid(
            ttcs,
            table.grid(MoveDirection::Down),
            ttc_seconds,
            move_percent,
        );

        self.note_fallback(up);
        self.note_fallback(down);
        (up.value, down.value)
    }

    fn note_fallback(&mut self, sample: GridSample) {
        if sample.fallback {
            self.fallback_count += 1;
            increment_counter(CounterMetric::InterpolationFallback);
        }
    }

    /// Probability annotations for each strike, in input order.
    ///
    /// A strike strictly above the price is crossed by an upward move; any
    /// other strike by a downward move.
    pub fn calculate_strike_probabilities(
        &mut self,
        current_price: Decimal,
        ttc_seconds: f64,
        strikes: &[Decimal],
        momentum_score: f64,
    ) -> Vec<StrikeProbability> {
        let bucket = self.select_bucket(momentum_score);
        self.last_bucket_used = Some(bucket);

        let price = current_price.to_f64().unwrap_or(0.0);

        strikes
            .iter()
            .map(|&strike| {
                let buffer = (current_price - strike).abs();
                let move_percent = if price > 0.0 {
                    buffer.to_f64().unwrap_or(0.0) / price * 100.0
                } else {
                    0.0
                };

                let direction = StrikeSide::classify(strike, current_price);
                let (positive_prob, negative_prob) = self.interpolate(ttc_seconds, move_percent);
                let prob_beyond = match direction {
                    StrikeSide::Above => positive_prob,
                    StrikeSide::Below => negative_prob,
                };

                StrikeProbability {
                    strike,
                    buffer,
                    move_percent,
                    direction,
                    prob_beyond,
                    prob_within: 100.0 - prob_beyond,
                    positive_prob,
                    negative_prob,
                }
            })
            .collect()
    }
}

/// Closest key to `target`; ties go to the lower key
fn nearest_bucket<V>(
    tables: &BTreeMap<MomentumBucket, V>,
    target: MomentumBucket,
) -> Option<MomentumBucket> {
    if tables.contains_key(&target) {
        return Some(target);
    }
    let below = tables.range(..target).next_back().map(|(b, _)| *b);
    let above = tables.range(target..).next().map(|(b, _)| *b);

    match (below, above) {
        (Some(lo), Some(hi)) => {
            if target.distance(hi) < target.distance(lo) {
                Some(hi)
            } else {
                Some(lo)
            }
        }
        (lo, hi) => lo.or(hi),
    }
}
