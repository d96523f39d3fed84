//! Market snapshot module
//!
//! The venue's current event and its strike markets, fetched over HTTP or
//! read from a file written by the ingestion process.

mod file;
mod http;
mod types;

pub use file::FileSnapshotFeed;
pub use http::{HttpSnapshotConfig, HttpSnapshotFeed};
pub use types::{MarketSnapshot, StrikeMarket};

use async_trait::async_trait;

/// Source of market snapshots
#[async_trait]
pub trait MarketSnapshotFeed: Send + Sync {
    /// Current event snapshot for a symbol
    async fn snapshot(&self, symbol: &str) -> anyhow::Result<MarketSnapshot>;
}
