//! strike-engine: strike probability tables for binary strike markets
//!
//! This library provides the core components for:
//! - Momentum-bucketed fingerprint tables and 2-D probability interpolation
//! - Weighted multi-horizon momentum from a live price feed
//! - Real-time price feeds from Binance
//! - Market snapshots over HTTP or from files
//! - A fixed-cadence production pipeline with failure backoff
//! - Atomic publication of live probabilities and strike tables
//! - Publish notifications and a Parquet audit trail
//! - Full observability stack

pub mod artifact;
pub mod audit;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod feed;
pub mod fingerprint;
pub mod market;
pub mod momentum;
pub mod notify;
pub mod pipeline;
pub mod probability;
pub mod telemetry;
pub mod ws;
