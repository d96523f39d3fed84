//! Published artifacts
//!
//! The live-probabilities and strike-table documents, and the repositories
//! they are published through. Every implementation guarantees that a reader
//! observes either the previous or the new complete document.

mod file;
mod memory;
mod types;

pub use file::{write_atomic, FileArtifactRepository};
pub use memory::{MemoryArtifactRepository, Published};
pub use types::{ArtifactError, LiveProbabilities, StrikeTableRow, StrikeTableSnapshot};

use async_trait::async_trait;

/// Store for the latest published documents
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Replace the live-probabilities document for `doc.symbol`
    async fn put_live_probabilities(&self, doc: &LiveProbabilities) -> Result<(), ArtifactError>;

    /// Replace the strike-table document for `doc.symbol`
    async fn put_strike_table(&self, doc: &StrikeTableSnapshot) -> Result<(), ArtifactError>;

    async fn live_probabilities(
        &self,
        symbol: &str,
    ) -> Result<Option<LiveProbabilities>, ArtifactError>;

    async fn strike_table(&self, symbol: &str) -> Result<Option<StrikeTableSnapshot>, ArtifactError>;
}
