//! Binance WebSocket price feed implementation

use super::{PriceFeed, PriceTick};
use crate::ws::{Backoff, WsClient, WsConfig, WsMessage};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Binance WebSocket base URL
pub const BINANCE_WS_URL: &str = "wss://stream.binance.com:9443/ws";

/// Binance trade message structure
#[derive(Debug, Deserialize)]
struct BinanceTradeMessage {
    #[serde(rename = "e")]
    event_type: String,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "p")]
    price: String,
    /// Trade time (milliseconds)
    #[serde(rename = "T")]
    trade_time: i64,
}

/// Binance `<symbol>@trade` stream, caching the latest trade price
pub struct BinanceFeed {
    /// Stream symbol, lowercase (e.g., "btcusdt")
    symbol: String,
    ws_url: String,
    /// Oldest tick `current_price` will still return
    max_staleness: Duration,
    latest: Arc<watch::Sender<Option<PriceTick>>>,
}

impl BinanceFeed {
    /// Create a feed for the given stream symbol
    pub fn new(symbol: impl Into<String>) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            symbol: symbol.into().to_lowercase(),
            ws_url: BINANCE_WS_URL.to_string(),
            max_staleness: Duration::from_secs(5),
            latest: Arc::new(latest),
        }
    }

    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = url.into();
        self
    }

    pub fn with_max_staleness(mut self, max_staleness: Duration) -> Self {
        self.max_staleness = max_staleness;
        self
    }

    /// Build the WebSocket URL for the trade stream
    fn build_ws_url(&self) -> String {
        format!("{}/{}@trade", self.ws_url.trim_end_matches('/'), self.symbol)
    }

    /// Whether this stream prices `asset` ("btc" matches "btcusdt")
    fn serves(&self, asset: &str) -> bool {
        self.symbol.starts_with(&asset.to_lowercase())
    }

    /// Most recent tick, if any has arrived
    pub fn latest(&self) -> Option<PriceTick> {
        self.latest.borrow().clone()
    }

    #[cfg(test)]
    pub(crate) fn set_latest(&self, tick: PriceTick) {
        self.latest.send_replace(Some(tick));
    }

    /// Watch the cached tick
    pub fn subscribe(&self) -> watch::Receiver<Option<PriceTick>> {
        self.latest.subscribe()
    }

    /// Connect and keep the cached tick current until `shutdown` flips
    pub fn start(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let url = self.build_ws_url();
        tracing::info!(symbol = %self.symbol, url = %url, "Subscribing to Binance feed");

        let config = WsConfig::new(url)
            .with_backoff(Backoff::new(Duration::from_secs(1), Duration::from_secs(30)));
        let ws_rx = WsClient::new(config).connect(shutdown);

        let latest = Arc::clone(&self.latest);
        tokio::spawn(async move {
            Self::run_message_loop(ws_rx, latest).await;
        })
    }

    /// Parse a Binance trade message into a PriceTick
    fn parse_message(msg: &str) -> Option<PriceTick> {
        let trade: BinanceTradeMessage = serde_json::from_str(msg).ok()?;

        if trade.event_type != "trade" {
            return None;
        }

        let price = Decimal::from_str(&trade.price).ok()?;
        if price <= Decimal::ZERO {
            return None;
        }
        let exchange_ts = Utc.timestamp_millis_opt(trade.trade_time).single()?;

        Some(PriceTick {
            symbol: trade.symbol,
            price,
            timestamp: Utc::now(),
            exchange_ts,
        })
    }

    async fn run_message_loop(
        mut ws_rx: mpsc::Receiver<WsMessage>,
        latest: Arc<watch::Sender<Option<PriceTick>>>,
    ) {
        while let Some(msg) = ws_rx.recv().await {
            match msg {
                WsMessage::Text(text) => {
                    if let Some(tick) = Self::parse_message(&text) {
                        latest.send_replace(Some(tick));
                    }
                }
                WsMessage::Connected => {
                    tracing::info!("Binance feed connected");
                }
                WsMessage::Reconnecting { attempt } => {
                    tracing::warn!(attempt, "Binance feed reconnecting");
                }
                WsMessage::Disconnected => {
                    tracing::warn!("Binance feed disconnected");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl PriceFeed for BinanceFeed {
    async fn current_price(&self, symbol: &str) -> anyhow::Result<PriceTick> {
        if !self.serves(symbol) {
            anyhow::bail!("Binance stream {} does not price {}", self.symbol, symbol);
        }

        let tick = self
            .latest()
            .ok_or_else(|| anyhow::anyhow!("No {} trade received yet", self.symbol))?;

        let age = tick.age(Utc::now()).to_std().unwrap_or_default();
        if age > self.max_staleness {
            anyhow::bail!(
                "Latest {} trade is stale ({} ms old)",
                self.symbol,
                age.as_millis()
            );
        }

        Ok(tick)
    }
}
