//! Shared fixtures for integration tests

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use strike_engine::feed::{PriceFeed, PriceTick};
use strike_engine::fingerprint::{CsvFingerprintStore, MomentumBucket};
use strike_engine::market::{MarketSnapshot, MarketSnapshotFeed, StrikeMarket};

/// Hit rates grow with TTC and shrink with move size; `shift` separates buckets
pub fn fingerprint_csv(shift: f64) -> String {
    let thresholds = [0.10, 0.25, 0.50, 1.00, 2.00];
    let mut csv = String::from("TTC");
    for t in thresholds {
        csv.push_str(&format!(",>= +{:.2}%", t));
    }
    for t in thresholds {
        csv.push_str(&format!(",<= -{:.2}%", t));
    }
    csv.push('\n');

    for minutes in [1u32, 5, 15, 30, 60] {
        csv.push_str(&format!("{}m TTC", minutes));
        for sign in [1.0, -1.0] {
            for t in thresholds {
                let base = 60.0 * (minutes as f64 / 60.0).sqrt() / (1.0 + 2.0 * t);
                let value = (base + sign * shift).clamp(0.0, 100.0);
                csv.push_str(&format!(",{:.2}", value));
            }
        }
        csv.push('\n');
    }
    csv
}

/// Write one table per bucket into `dir`
pub fn write_fingerprints(dir: &Path, symbol: &str, buckets: &[i8]) {
    std::fs::create_dir_all(dir).unwrap();
    for &b in buckets {
        let bucket = MomentumBucket::new(b).unwrap();
        let store = CsvFingerprintStore::new(dir);
        std::fs::write(
            store.table_path(symbol, bucket),
            fingerprint_csv(f64::from(b)),
        )
        .unwrap();
    }
}

/// Event closing in 15 minutes with strikes `first, first + step, ...`
pub fn snapshot(first: i64, step: i64, count: i64) -> MarketSnapshot {
    MarketSnapshot {
        event_id: "KXBTCD-26JAN0117".to_string(),
        close_timestamp: Some(Utc::now() + Duration::minutes(15)),
        status: "open".to_string(),
        title: "Bitcoin price today at 5pm EST?".to_string(),
        strike_tier_spacing: None,
        markets: (0..count)
            .map(|i| {
                let strike = Decimal::from(first + step * i);
                StrikeMarket {
                    ticker: format!("KXBTCD-26JAN0117-T{}", strike),
                    floor_strike: strike,
                    yes_ask: Some(50),
                    no_ask: Some(52),
                    volume: 100,
                    status: "active".to_string(),
                }
            })
            .collect(),
    }
}

/// Price feed returning a fixed price
pub struct FixedPriceFeed {
    price: Decimal,
}

impl FixedPriceFeed {
    pub fn new(price: Decimal) -> Self {
        Self { price }
    }
}

#[async_trait]
impl PriceFeed for FixedPriceFeed {
    async fn current_price(&self, _symbol: &str) -> anyhow::Result<PriceTick> {
        let now = Utc::now();
        Ok(PriceTick {
            symbol: "BTCUSDT".to_string(),
            price: self.price,
            timestamp: now,
            exchange_ts: now,
        })
    }
}

/// Snapshot feed whose snapshot can be swapped between cycles
pub struct SwitchableSnapshotFeed {
    snapshot: Mutex<MarketSnapshot>,
    calls: AtomicUsize,
}

impl SwitchableSnapshotFeed {
    pub fn new(snapshot: MarketSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, snapshot: MarketSnapshot) {
        *self.snapshot.lock().unwrap() = snapshot;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketSnapshotFeed for SwitchableSnapshotFeed {
    async fn snapshot(&self, _symbol: &str) -> anyhow::Result<MarketSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot.lock().unwrap().clone())
    }
}
