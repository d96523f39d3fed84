//! Published artifact documents
//!
//! Both documents are serialized as camelCase JSON and replaced wholesale on
//! every successful cycle.

use crate::fingerprint::MomentumBucket;
use crate::momentum::MomentumReading;
use crate::probability::{ContractSide, StrikeProbability};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Probability annotations for the whole strike ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveProbabilities {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub current_price: Decimal,
    /// Price rounded to the nearest ladder step
    pub base_strike: Decimal,
    pub ttc_seconds: i64,
    pub momentum_score: f64,
    pub momentum_bucket: MomentumBucket,
    pub strikes: Vec<Decimal>,
    pub probabilities: Vec<StrikeProbability>,
    pub fingerprint_id: String,
}

/// One listed strike with its probability and current asks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrikeTableRow {
    pub strike: Decimal,
    pub buffer: Decimal,
    /// Buffer as a percentage of the current price
    pub buffer_pct: f64,
    /// Chance the active side settles in the money
    pub probability: f64,
    pub yes_ask: Option<u32>,
    pub no_ask: Option<u32>,
    /// Model probability of YES minus the YES ask, in cents
    pub yes_diff: Option<f64>,
    /// Model probability of NO minus the NO ask, in cents
    pub no_diff: Option<f64>,
    pub volume: u64,
    pub ticker: String,
    pub active_side: ContractSide,
}

/// Strike table consumed by the trade supervisor and UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrikeTableSnapshot {
    pub symbol: String,
    pub current_price: Decimal,
    pub ttc_seconds: i64,
    pub event_id: String,
    pub market_title: String,
    pub strike_tier_spacing: Option<Decimal>,
    pub market_status: String,
    pub last_updated: DateTime<Utc>,
    pub rows: Vec<StrikeTableRow>,
    pub momentum: MomentumReading,
    pub fingerprint_id: String,
}

/// Artifact persistence errors
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact I/O failed for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode artifact: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Malformed artifact {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Artifact task failed: {0}")]
    Task(String),
}
