//! In-process artifact repository
//!
//! Holds the latest documents in watch channels. Publishing swaps an `Arc`,
//! so readers get either the previous or the new document without waiting on
//! the writer.

use super::types::{ArtifactError, LiveProbabilities, StrikeTableSnapshot};
use super::ArtifactRepository;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

/// Latest published document, if any
pub type Published<T> = Option<Arc<T>>;

/// Artifact repository for in-process consumers
pub struct MemoryArtifactRepository {
    live: watch::Sender<Published<LiveProbabilities>>,
    table: watch::Sender<Published<StrikeTableSnapshot>>,
}

impl MemoryArtifactRepository {
    pub fn new() -> Self {
        let (live, _) = watch::channel(None);
        let (table, _) = watch::channel(None);
        Self { live, table }
    }

    /// Watch live-probabilities publications
    pub fn subscribe_live_probabilities(&self) -> watch::Receiver<Published<LiveProbabilities>> {
        self.live.subscribe()
    }

    /// Watch strike-table publications
    pub fn subscribe_strike_table(&self) -> watch::Receiver<Published<StrikeTableSnapshot>> {
        self.table.subscribe()
    }

    /// Latest strike table regardless of symbol
    pub fn latest_strike_table(&self) -> Published<StrikeTableSnapshot> {
        self.table.borrow().clone()
    }

    /// Latest live probabilities regardless of symbol
    pub fn latest_live_probabilities(&self) -> Published<LiveProbabilities> {
        self.live.borrow().clone()
    }
}

impl Default for MemoryArtifactRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactRepository for MemoryArtifactRepository {
    async fn put_live_probabilities(&self, doc: &LiveProbabilities) -> Result<(), ArtifactError> {
        self.live.send_replace(Some(Arc::new(doc.clone())));
        Ok(())
    }

    async fn put_strike_table(&self, doc: &StrikeTableSnapshot) -> Result<(), ArtifactError> {
        self.table.send_replace(Some(Arc::new(doc.clone())));
        Ok(())
    }

    async fn live_probabilities(
        &self,
        symbol: &str,
    ) -> Result<Option<LiveProbabilities>, ArtifactError> {
        Ok(self
            .latest_live_probabilities()
            .filter(|doc| doc.symbol.eq_ignore_ascii_case(symbol))
            .map(|doc| (*doc).clone()))
    }

    async fn strike_table(&self, symbol: &str) -> Result<Option<StrikeTableSnapshot>, ArtifactError> {
        Ok(self
            .latest_strike_table()
            .filter(|doc| doc.symbol.eq_ignore_ascii_case(symbol))
            .map(|doc| (*doc).clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::test_support::sample_strike_table;

    #[tokio::test]
    async fn test_put_and_get() {
        let repo = MemoryArtifactRepository::new();
        assert!(repo.strike_table("btc").await.unwrap().is_none());

        repo.put_strike_table(&sample_strike_table(50000)).await.unwrap();
        assert!(repo.strike_table("BTC").await.unwrap().is_some());
        assert!(repo.strike_table("eth").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_whole_documents() {
        let repo = MemoryArtifactRepository::new();
        let mut rx = repo.subscribe_strike_table();

        repo.put_strike_table(&sample_strike_table(50000)).await.unwrap();
        rx.changed().await.unwrap();
        let first = rx.borrow_and_update().clone().unwrap();

        repo.put_strike_table(&sample_strike_table(51000)).await.unwrap();
        // A reader holding the old Arc keeps a complete document
        assert_eq!(first.current_price, sample_strike_table(50000).current_price);
        assert_eq!(
            repo.latest_strike_table().unwrap().current_price,
            sample_strike_table(51000).current_price
        );
    }
}
