//! File-backed market snapshot feed
//!
//! Reads the snapshot a venue-ingestion process keeps rewriting on disk.
//! `{symbol}` in the path is replaced with the lowercase symbol.

use super::{MarketSnapshot, MarketSnapshotFeed};
use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;

/// Market snapshot feed reading a JSON file
#[derive(Debug, Clone)]
pub struct FileSnapshotFeed {
    path_template: String,
}

impl FileSnapshotFeed {
    pub fn new(path_template: impl Into<String>) -> Self {
        Self {
            path_template: path_template.into(),
        }
    }

    /// Resolved path for a symbol
    pub fn path_for(&self, symbol: &str) -> PathBuf {
        PathBuf::from(
            self.path_template
                .replace("{symbol}", &symbol.to_lowercase()),
        )
    }
}

#[async_trait]
impl MarketSnapshotFeed for FileSnapshotFeed {
    async fn snapshot(&self, symbol: &str) -> anyhow::Result<MarketSnapshot> {
        let path = self.path_for(symbol);
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read market snapshot {}", path.display()))?;

        let snapshot: MarketSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("Malformed market snapshot {}", path.display()))?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_path_template() {
        let feed = FileSnapshotFeed::new("/data/{symbol}_market.json");
        assert_eq!(feed.path_for("BTC"), PathBuf::from("/data/btc_market.json"));
    }

    #[tokio::test]
    async fn test_reads_snapshot() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("btc_market.json"),
            r#"{"eventId": "E1", "closeTimestamp": "2026-01-01T17:00:00Z", "markets": [
                {"ticker": "T1", "floorStrike": 50000}
            ]}"#,
        )
        .unwrap();

        let template = format!("{}/{{symbol}}_market.json", dir.path().display());
        let feed = FileSnapshotFeed::new(template);
        let snapshot = feed.snapshot("btc").await.unwrap();
        assert_eq!(snapshot.event_id, "E1");
        assert_eq!(snapshot.markets.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_or_malformed_file() {
        let dir = TempDir::new().unwrap();
        let template = format!("{}/{{symbol}}_market.json", dir.path().display());
        let feed = FileSnapshotFeed::new(template);
        assert!(feed.snapshot("btc").await.is_err());

        std::fs::write(dir.path().join("btc_market.json"), "{ truncated").unwrap();
        assert!(feed.snapshot("btc").await.is_err());
    }
}
