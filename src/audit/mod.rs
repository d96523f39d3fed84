//! Probability audit trail
//!
//! Every successful cycle's strike probabilities, stored to Parquet for
//! offline review of the model against settlements.

mod parquet;
mod recorder;

pub use parquet::{
    probability_schema, ParquetReader, ParquetWriter, ProbabilityRecord, PROBABILITY_PREFIX,
};
pub use recorder::{ProbabilityRecorder, RecorderConfig, RecorderStats};
