//! Price feed module
//!
//! Current spot price for the tracked asset, from the Binance trade stream

mod binance;
mod types;

pub use binance::BinanceFeed;
pub use types::PriceTick;

use async_trait::async_trait;

/// Source of the current price for a symbol
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Latest price, or an error when no fresh price is available
    async fn current_price(&self, symbol: &str) -> anyhow::Result<PriceTick>;
}
