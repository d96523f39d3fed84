//! WebSocket client library
//!
//! Reconnecting read-only WebSocket client used by the price feed.

mod client;
mod types;

pub use client::WsClient;
pub use types::{Backoff, Keepalive, WsConfig, WsError, WsMessage};
