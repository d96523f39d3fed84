//! Downstream publish notifications
//!
//! Delivery is at-most-once: a failed notification is logged and counted,
//! never retried. The published artifacts stay the source of truth.

mod http;

pub use http::HttpNotifier;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Sent after a strike table is published
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishEvent {
    pub symbol: String,
    pub cycle: u64,
    pub event_id: String,
    pub fingerprint_id: String,
    pub rows: usize,
    pub published_at: DateTime<Utc>,
}

/// Fire-and-forget publish hook. Must not block the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: PublishEvent);
}
