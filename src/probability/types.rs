//! Strike probability types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Position of a strike relative to the current price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrikeSide {
    /// Strike strictly above the current price
    Above,
    /// Strike at or below the current price
    Below,
}

impl StrikeSide {
    /// Classify a strike. A strike equal to the price counts as below.
    pub fn classify(strike: Decimal, current_price: Decimal) -> Self {
        if strike > current_price {
            StrikeSide::Above
        } else {
            StrikeSide::Below
        }
    }

    /// Contract side that is in the money while price holds
    pub fn active_side(self) -> ContractSide {
        match self {
            StrikeSide::Above => ContractSide::No,
            StrikeSide::Below => ContractSide::Yes,
        }
    }
}

/// Binary contract side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractSide {
    Yes,
    No,
}

/// Probability annotation for one strike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrikeProbability {
    pub strike: Decimal,
    /// Absolute distance between price and strike
    pub buffer: Decimal,
    /// Buffer as a percentage of the current price
    pub move_percent: f64,
    pub direction: StrikeSide,
    /// Historical chance that price crosses the strike before close
    pub prob_beyond: f64,
    /// `100 - prob_beyond`
    pub prob_within: f64,
    /// Raw upward-move hit rate at this distance
    pub positive_prob: f64,
    /// Raw downward-move hit rate at this distance
    pub negative_prob: f64,
}
