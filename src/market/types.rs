//! Market snapshot types
//!
//! One event (settlement window) with its ladder of strike markets, as
//! published by the venue-ingestion side.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One strike contract within an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrikeMarket {
    pub ticker: String,
    /// Settlement strike
    pub floor_strike: Decimal,
    /// Best YES ask in cents
    #[serde(default)]
    pub yes_ask: Option<u32>,
    /// Best NO ask in cents
    #[serde(default)]
    pub no_ask: Option<u32>,
    #[serde(default)]
    pub volume: u64,
    #[serde(default)]
    pub status: String,
}

/// Event-level view of the venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub event_id: String,
    /// Settlement boundary; TTC cannot be computed without it
    #[serde(default)]
    pub close_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub title: String,
    /// Detected spacing between adjacent strikes
    #[serde(default)]
    pub strike_tier_spacing: Option<Decimal>,
    #[serde(default)]
    pub markets: Vec<StrikeMarket>,
}

impl MarketSnapshot {
    /// Strikes of every listed market, in listing order
    pub fn strikes(&self) -> Vec<Decimal> {
        self.markets.iter().map(|m| m.floor_strike).collect()
    }

    /// Market listed at exactly `strike`
    pub fn market_at(&self, strike: Decimal) -> Option<&StrikeMarket> {
        self.markets.iter().find(|m| m.floor_strike == strike)
    }
}
