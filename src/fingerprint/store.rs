//! Fingerprint table storage
//!
//! The engine only needs a table per (symbol, bucket). The CSV store reads
//! files named `<symbol>_momentum_<bucket>.csv` from a single directory.

use super::table::FingerprintTable;
use super::types::{FingerprintError, MomentumBucket};
use std::fs;
use std::path::{Path, PathBuf};

/// Source of fingerprint tables
pub trait FingerprintStore: Send + Sync {
    /// Buckets with a table available for the symbol, ascending
    fn available_buckets(&self, symbol: &str) -> Result<Vec<MomentumBucket>, FingerprintError>;

    /// Load the table for one bucket
    fn load_table(
        &self,
        symbol: &str,
        bucket: MomentumBucket,
    ) -> Result<FingerprintTable, FingerprintError>;
}

/// Directory of CSV fingerprint tables
#[derive(Debug, Clone)]
pub struct CsvFingerprintStore {
    dir: PathBuf,
}

impl CsvFingerprintStore {
    /// Create a store reading from `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File stem for a (symbol, bucket) pair, also used as the table id
    pub fn table_id(symbol: &str, bucket: MomentumBucket) -> String {
        format!("{}_momentum_{}", symbol.to_lowercase(), bucket)
    }

    /// Full path for a (symbol, bucket) pair
    pub fn table_path(&self, symbol: &str, bucket: MomentumBucket) -> PathBuf {
        self.dir
            .join(format!("{}.csv", Self::table_id(symbol, bucket)))
    }

    /// Extract the bucket from a file name belonging to `symbol`. Only the
    /// spelling `table_path` produces is accepted ("3", not "03" or "+3").
    fn bucket_from_file_name(symbol: &str, file_name: &str) -> Option<MomentumBucket> {
        let prefix = format!("{}_momentum_", symbol.to_lowercase());
        let raw = file_name.strip_prefix(&prefix)?.strip_suffix(".csv")?;
        let bucket = MomentumBucket::new(raw.parse::<i8>().ok()?)?;
        (bucket.to_string() == raw).then_some(bucket)
    }
}

impl FingerprintStore for CsvFingerprintStore {
    fn available_buckets(&self, symbol: &str) -> Result<Vec<MomentumBucket>, FingerprintError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(dir = ?self.dir, "Fingerprint directory does not exist");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(FingerprintError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut buckets: Vec<MomentumBucket> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                Self::bucket_from_file_name(symbol, name.to_str()?)
            })
            .collect();
        buckets.sort();
        buckets.dedup();

        tracing::debug!(symbol, count = buckets.len(), "Discovered fingerprint buckets");
        Ok(buckets)
    }

    fn load_table(
        &self,
        symbol: &str,
        bucket: MomentumBucket,
    ) -> Result<FingerprintTable, FingerprintError> {
        let path = self.table_path(symbol, bucket);
        let content = fs::read_to_string(&path).map_err(|source| FingerprintError::Io {
            path: path.clone(),
            source,
        })?;

        let id = Self::table_id(symbol, bucket);
        FingerprintTable::from_csv_str(&id, &symbol.to_lowercase(), bucket, &content)
    }
}
