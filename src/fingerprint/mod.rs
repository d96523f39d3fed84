//! Fingerprint tables
//!
//! Precomputed historical hit-rate tables, one per symbol and momentum
//! bucket. Each table answers "how often did price move at least X% within
//! N minutes" for upward and downward moves. Tables are built offline; this
//! module only loads and validates them.

mod store;
mod table;
mod types;

pub use store::{CsvFingerprintStore, FingerprintStore};
pub use table::{parse_threshold_label, parse_ttc_label, DirectionGrid, FingerprintTable};
pub use types::{FingerprintError, MomentumBucket, MoveDirection};
