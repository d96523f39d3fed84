//! Momentum types
//!
//! A momentum reading is a weighted blend of percent price changes over a
//! fixed set of lookback horizons.

use crate::fingerprint::MomentumBucket;
use serde::{Deserialize, Serialize};

/// One lookback horizon and its weight in the blended score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Horizon {
    pub seconds: u64,
    pub weight: f64,
}

impl Horizon {
    pub const fn new(seconds: u64, weight: f64) -> Self {
        Self { seconds, weight }
    }
}

/// 1m, 2m, 3m, 4m, 15m, 30m with weights summing to 1
pub const DEFAULT_HORIZONS: [Horizon; 6] = [
    Horizon::new(60, 0.30),
    Horizon::new(120, 0.25),
    Horizon::new(180, 0.20),
    Horizon::new(240, 0.15),
    Horizon::new(900, 0.07),
    Horizon::new(1800, 0.03),
];

/// Percent change over one horizon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizonDelta {
    pub horizon_seconds: u64,
    /// `None` until the history reaches back this far
    pub delta_pct: Option<f64>,
}

/// Blended momentum at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentumReading {
    /// Σ weight × delta, in percent (0.12 = +0.12%)
    pub weighted_score: f64,
    pub deltas: Vec<HorizonDelta>,
}

impl MomentumReading {
    /// Reading with no history for any horizon
    pub fn neutral(horizons: &[Horizon]) -> Self {
        Self {
            weighted_score: 0.0,
            deltas: horizons
                .iter()
                .map(|h| HorizonDelta {
                    horizon_seconds: h.seconds,
                    delta_pct: None,
                })
                .collect(),
        }
    }

    /// Bucket this reading maps to
    pub fn bucket(&self) -> MomentumBucket {
        MomentumBucket::from_score(self.weighted_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let total: f64 = DEFAULT_HORIZONS.iter().map(|h| h.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_neutral_reading() {
        let reading = MomentumReading::neutral(&DEFAULT_HORIZONS);
        assert_eq!(reading.deltas.len(), 6);
        assert!(reading.deltas.iter().all(|d| d.delta_pct.is_none()));
        assert_eq!(reading.bucket(), MomentumBucket::ZERO);
    }

    #[test]
    fn test_reading_serializes_camel_case() {
        let reading = MomentumReading {
            weighted_score: 0.1,
            deltas: vec![HorizonDelta {
                horizon_seconds: 60,
                delta_pct: Some(0.2),
            }],
        };
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["weightedScore"], 0.1);
        assert_eq!(json["deltas"][0]["horizonSeconds"], 60);
        assert_eq!(json["deltas"][0]["deltaPct"], 0.2);
    }
}
