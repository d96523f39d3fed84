//! Configuration types for strike-engine

use crate::momentum::{Horizon, DEFAULT_HORIZONS};
use crate::telemetry::LogFormat;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub feed: FeedConfig,
    pub market: MarketConfig,
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub fingerprint: FingerprintConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub momentum: MomentumConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Price feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub exchange: String,
    /// Exchange stream symbol (e.g., "BTCUSDT")
    pub symbol: String,
    /// Override for the exchange WebSocket base URL
    #[serde(default)]
    pub ws_url: Option<String>,
    /// Reject quotes older than this
    #[serde(default = "default_max_staleness_ms")]
    pub max_staleness_ms: u64,
}

fn default_max_staleness_ms() -> u64 {
    5000
}

impl FeedConfig {
    pub fn max_staleness(&self) -> Duration {
        Duration::from_millis(self.max_staleness_ms)
    }
}

/// Where market snapshots come from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    Http,
    File,
}

/// Market snapshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Asset symbol used for artifacts and fingerprints (e.g., "btc")
    pub symbol: String,
    pub source: SnapshotSource,
    /// Snapshot endpoint, required for `source = "http"`
    #[serde(default)]
    pub url: Option<String>,
    /// Snapshot file template, required for `source = "file"`.
    /// `{symbol}` is replaced with the lowercase symbol.
    #[serde(default)]
    pub path: Option<String>,
}

/// Fingerprint table location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintConfig {
    #[serde(default = "default_fingerprint_dir")]
    pub dir: PathBuf,
}

fn default_fingerprint_dir() -> PathBuf {
    PathBuf::from("./fingerprints")
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            dir: default_fingerprint_dir(),
        }
    }
}

/// Production loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Target cycle interval
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Failures in a row before the loop pauses
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Pause length after too many failures
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Cycles slower than this are counted as slow
    #[serde(default = "default_slow_cycle_ms")]
    pub slow_cycle_ms: u64,

    /// Bound on each collaborator call, clamped to 1-5 s
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,

    /// Spacing of the probability ladder
    #[serde(default = "default_strike_step")]
    pub strike_step: Decimal,

    /// Ladder strikes on each side of the base strike
    #[serde(default = "default_strike_levels")]
    pub strike_levels: u32,

    /// Cycles kept for inspection
    #[serde(default = "default_history_len")]
    pub history_len: usize,

    /// `health()` fails at this many consecutive failures
    #[serde(default = "default_health_failure_threshold")]
    pub health_failure_threshold: u32,
}

fn default_interval_ms() -> u64 {
    1000
}
fn default_max_consecutive_failures() -> u32 {
    5
}
fn default_cooldown_secs() -> u64 {
    10
}
fn default_slow_cycle_ms() -> u64 {
    500
}
fn default_step_timeout_ms() -> u64 {
    3000
}
fn default_strike_step() -> Decimal {
    Decimal::from(250)
}
fn default_strike_levels() -> u32 {
    10
}
fn default_history_len() -> usize {
    20
}
fn default_health_failure_threshold() -> u32 {
    3
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_consecutive_failures: default_max_consecutive_failures(),
            cooldown_secs: default_cooldown_secs(),
            slow_cycle_ms: default_slow_cycle_ms(),
            step_timeout_ms: default_step_timeout_ms(),
            strike_step: default_strike_step(),
            strike_levels: default_strike_levels(),
            history_len: default_history_len(),
            health_failure_threshold: default_health_failure_threshold(),
        }
    }
}

impl PipelineConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn slow_cycle(&self) -> Duration {
        Duration::from_millis(self.slow_cycle_ms)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms.clamp(1000, 5000))
    }
}

/// Momentum horizons. Empty lists mean the built-in 1m-30m set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MomentumConfig {
    #[serde(default)]
    pub horizons_secs: Vec<u64>,
    #[serde(default)]
    pub weights: Vec<f64>,
}

impl MomentumConfig {
    pub fn horizons(&self) -> anyhow::Result<Vec<Horizon>> {
        if self.horizons_secs.is_empty() && self.weights.is_empty() {
            return Ok(DEFAULT_HORIZONS.to_vec());
        }
        if self.horizons_secs.len() != self.weights.len() {
            anyhow::bail!(
                "momentum.horizons_secs has {} entries but momentum.weights has {}",
                self.horizons_secs.len(),
                self.weights.len()
            );
        }
        if self.horizons_secs.contains(&0) {
            anyhow::bail!("momentum.horizons_secs must be positive");
        }
        Ok(self
            .horizons_secs
            .iter()
            .zip(&self.weights)
            .map(|(&seconds, &weight)| Horizon::new(seconds, weight))
            .collect())
    }
}

/// Artifact storage backend
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactBackend {
    #[default]
    File,
    Memory,
}

/// Published artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    #[serde(default)]
    pub backend: ArtifactBackend,
    #[serde(default = "default_artifacts_dir")]
    pub dir: PathBuf,
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("./artifacts")
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            backend: ArtifactBackend::default(),
            dir: default_artifacts_dir(),
        }
    }
}

/// Downstream webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default = "default_notify_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_notify_timeout_ms() -> u64 {
    2000
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            timeout_ms: default_notify_timeout_ms(),
        }
    }
}

impl NotifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Probability audit trail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_audit_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_rotation_interval_secs")]
    pub rotation_interval_secs: u64,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

fn default_audit_dir() -> PathBuf {
    PathBuf::from("./data/audit")
}
fn default_rotation_interval_secs() -> u64 {
    3600
}
fn default_buffer_size() -> usize {
    1000
}
fn default_flush_interval_secs() -> u64 {
    60
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: default_audit_dir(),
            rotation_interval_secs: default_rotation_interval_secs(),
            buffer_size: default_buffer_size(),
            flush_interval_secs: default_flush_interval_secs(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus listener port; no exporter when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pipeline.interval_ms == 0 {
            anyhow::bail!("pipeline.interval_ms must be positive");
        }
        if self.pipeline.max_consecutive_failures == 0 {
            anyhow::bail!("pipeline.max_consecutive_failures must be at least 1");
        }
        if self.pipeline.strike_step <= Decimal::ZERO {
            anyhow::bail!("pipeline.strike_step must be positive");
        }
        match self.market.source {
            SnapshotSource::Http if self.market.url.is_none() => {
                anyhow::bail!("market.url is required for the http snapshot source")
            }
            SnapshotSource::File if self.market.path.is_none() => {
                anyhow::bail!("market.path is required for the file snapshot source")
            }
            _ => {}
        }
        self.momentum.horizons()?;
        Ok(())
    }
}
