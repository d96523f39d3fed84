//! HTTP market snapshot client
//!
//! Polls a JSON endpoint exposed by the venue-ingestion service. The
//! endpoint returns the current event for a symbol as a `MarketSnapshot`.

use super::{MarketSnapshot, MarketSnapshotFeed};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Configuration for the HTTP snapshot client
#[derive(Debug, Clone)]
pub struct HttpSnapshotConfig {
    /// Snapshot endpoint; the symbol is sent as the `symbol` query parameter
    pub url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl HttpSnapshotConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(3),
        }
    }
}

/// Market snapshot feed backed by an HTTP endpoint
pub struct HttpSnapshotFeed {
    config: HttpSnapshotConfig,
    client: Client,
}

impl HttpSnapshotFeed {
    pub fn new(config: HttpSnapshotConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { config, client })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl MarketSnapshotFeed for HttpSnapshotFeed {
    async fn snapshot(&self, symbol: &str) -> anyhow::Result<MarketSnapshot> {
        tracing::debug!(url = %self.config.url, symbol, "Fetching market snapshot");

        let response = self
            .client
            .get(&self.config.url)
            .query(&[("symbol", symbol)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Snapshot endpoint error: {} - {}", status, body);
        }

        let snapshot: MarketSnapshot = response.json().await?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = HttpSnapshotConfig::new("http://localhost:8080/snapshot");
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_client_creation() {
        let feed = HttpSnapshotFeed::new(HttpSnapshotConfig::new("http://localhost:8080/snapshot"))
            .unwrap();
        assert_eq!(feed.url(), "http://localhost:8080/snapshot");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        let mut config = HttpSnapshotConfig::new("http://127.0.0.1:1/snapshot");
        config.timeout = Duration::from_millis(500);
        let feed = HttpSnapshotFeed::new(config).unwrap();
        assert!(feed.snapshot("btc").await.is_err());
    }
}
