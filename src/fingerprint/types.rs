//! Fingerprint types
//!
//! Momentum buckets and the errors raised while loading fingerprint tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Quantized momentum score selecting which fingerprint table is used.
///
/// Buckets are expressed in basis points of weighted price change: a momentum
/// score of `0.12` (percent) maps to bucket `12`. Values are clamped to
/// `[-30, 30]` after scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MomentumBucket(i8);

impl MomentumBucket {
    /// Lowest bucket a table can be stored under
    pub const MIN: i8 = -30;
    /// Highest bucket a table can be stored under
    pub const MAX: i8 = 30;

    /// Neutral momentum
    pub const ZERO: MomentumBucket = MomentumBucket(0);

    /// Create a bucket, rejecting values outside `[-30, 30]`
    pub fn new(value: i8) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then_some(Self(value))
    }

    /// Map a momentum score (weighted percent change) to its bucket.
    ///
    /// Non-finite scores map to the neutral bucket.
    pub fn from_score(score: f64) -> Self {
        if !score.is_finite() {
            return Self::ZERO;
        }
        let scaled = (score * 100.0).round();
        Self(scaled.clamp(Self::MIN as f64, Self::MAX as f64) as i8)
    }

    /// Raw bucket value
    pub fn value(self) -> i8 {
        self.0
    }

    /// Absolute distance between two buckets
    pub fn distance(self, other: MomentumBucket) -> u8 {
        (self.0 as i16 - other.0 as i16).unsigned_abs() as u8
    }
}

impl fmt::Display for MomentumBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a historical move relative to entry price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    /// Price finished at least X% above entry
    Up,
    /// Price finished at least X% below entry
    Down,
}

/// Fingerprint loading errors
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// No table exists for any bucket of the symbol
    #[error("No fingerprint data found for symbol {symbol}")]
    NoFingerprintData { symbol: String },
    /// Filesystem error
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Malformed table file
    #[error("Malformed fingerprint {id} at line {line}: {reason}")]
    Parse {
        id: String,
        line: usize,
        reason: String,
    },
    /// Table shape or contents violate an invariant
    #[error("Invalid fingerprint {id}: {reason}")]
    InvalidTable { id: String, reason: String },
}
