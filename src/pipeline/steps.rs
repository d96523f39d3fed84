//! The four pipeline steps
//!
//! Each step takes the previous step's output. Collaborator calls are bounded
//! by the step timeout; an elapsed timeout is an ordinary step failure.

use super::helpers::{
    base_strike, build_strike_ladder, calculate_ttc, detect_strike_tier_spacing, edge_diffs,
};
use super::types::PipelineError;
use crate::artifact::{LiveProbabilities, StrikeTableRow, StrikeTableSnapshot};
use crate::feed::{PriceFeed, PriceTick};
use crate::market::{MarketSnapshot, MarketSnapshotFeed};
use crate::momentum::MomentumReading;
use crate::probability::ProbabilityEngine;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;

/// Probability ladder shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LadderSettings {
    pub step: Decimal,
    pub levels: u32,
}

impl Default for LadderSettings {
    fn default() -> Self {
        Self {
            step: Decimal::from(250),
            levels: 10,
        }
    }
}

/// Step 1: current price for `symbol`
pub async fn get_price(
    feed: &dyn PriceFeed,
    symbol: &str,
    timeout: Duration,
) -> Result<PriceTick, PipelineError> {
    match tokio::time::timeout(timeout, feed.current_price(symbol)).await {
        Ok(Ok(tick)) => Ok(tick),
        Ok(Err(e)) => Err(PipelineError::PriceUnavailable(format!("{:#}", e))),
        Err(_) => Err(PipelineError::PriceUnavailable(format!(
            "timed out after {} ms",
            timeout.as_millis()
        ))),
    }
}

/// Step 2: current market snapshot, with its strike tier spacing filled in
pub async fn get_market_snapshot(
    feed: &dyn MarketSnapshotFeed,
    symbol: &str,
    timeout: Duration,
) -> Result<MarketSnapshot, PipelineError> {
    let mut snapshot = match tokio::time::timeout(timeout, feed.snapshot(symbol)).await {
        Ok(Ok(snapshot)) => snapshot,
        Ok(Err(e)) => return Err(PipelineError::MarketSnapshotUnavailable(format!("{:#}", e))),
        Err(_) => {
            return Err(PipelineError::MarketSnapshotUnavailable(format!(
                "timed out after {} ms",
                timeout.as_millis()
            )))
        }
    };

    let spacing = detect_strike_tier_spacing(&snapshot.strikes())?;
    snapshot.strike_tier_spacing = Some(spacing);
    Ok(snapshot)
}

/// Step 3: probabilities for the ladder around the current price
pub fn compute_probabilities(
    engine: &mut ProbabilityEngine,
    tick: &PriceTick,
    snapshot: &MarketSnapshot,
    momentum: &MomentumReading,
    ladder: LadderSettings,
    now: DateTime<Utc>,
) -> Result<LiveProbabilities, PipelineError> {
    let close = snapshot.close_timestamp.ok_or_else(|| {
        PipelineError::TtcCalculation(format!(
            "event {} has no close timestamp",
            snapshot.event_id
        ))
    })?;
    let ttc_seconds = calculate_ttc(close, now);

    let strikes = build_strike_ladder(tick.price, ladder.step, ladder.levels);
    let probabilities = engine.calculate_strike_probabilities(
        tick.price,
        ttc_seconds as f64,
        &strikes,
        momentum.weighted_score,
    );

    Ok(LiveProbabilities {
        timestamp: now,
        symbol: engine.symbol().to_string(),
        current_price: tick.price,
        base_strike: base_strike(tick.price, ladder.step),
        ttc_seconds,
        momentum_score: momentum.weighted_score,
        momentum_bucket: engine.last_bucket_used().unwrap_or(engine.active_bucket()),
        strikes,
        probabilities,
        fingerprint_id: engine.fingerprint_id().to_string(),
    })
}

/// Step 4: join ladder probabilities with the listed markets.
///
/// Ladder strikes with no listed market are left out.
pub fn synthesize_strike_table(
    live: &LiveProbabilities,
    snapshot: &MarketSnapshot,
    momentum: MomentumReading,
    now: DateTime<Utc>,
) -> StrikeTableSnapshot {
    let rows = live
        .probabilities
        .iter()
        .filter_map(|p| {
            let market = snapshot.market_at(p.strike)?;
            let (yes_diff, no_diff) =
                edge_diffs(p.direction, p.prob_within, market.yes_ask, market.no_ask);

            Some(StrikeTableRow {
                strike: p.strike,
                buffer: p.buffer,
                buffer_pct: p.move_percent,
                probability: p.prob_within,
                yes_ask: market.yes_ask,
                no_ask: market.no_ask,
                yes_diff,
                no_diff,
                volume: market.volume,
                ticker: market.ticker.clone(),
                active_side: p.direction.active_side(),
            })
        })
        .collect();

    StrikeTableSnapshot {
        symbol: live.symbol.clone(),
        current_price: live.current_price,
        ttc_seconds: live.ttc_seconds,
        event_id: snapshot.event_id.clone(),
        market_title: snapshot.title.clone(),
        strike_tier_spacing: snapshot.strike_tier_spacing,
        market_status: snapshot.status.clone(),
        last_updated: now,
        rows,
        momentum,
        fingerprint_id: live.fingerprint_id.clone(),
    }
}
