//! Parquet storage for probability records, with time-based rotation

use crate::artifact::LiveProbabilities;
use crate::probability::StrikeSide;
use arrow::array::{
    ArrayRef, Float64Array, Int64Array, Int8Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Duration, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// File name prefix for probability audit files
pub const PROBABILITY_PREFIX: &str = "probabilities";

/// One strike's probabilities from one successful cycle
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityRecord {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub fingerprint_id: String,
    pub bucket: i8,
    pub price: Decimal,
    pub ttc_seconds: i64,
    pub strike: Decimal,
    pub direction: StrikeSide,
    pub move_percent: f64,
    pub prob_beyond: f64,
    pub prob_within: f64,
}

impl ProbabilityRecord {
    /// One record per strike in a live-probabilities document
    pub fn from_live(live: &LiveProbabilities) -> Vec<Self> {
        live.probabilities
            .iter()
            .map(|p| Self {
                timestamp: live.timestamp,
                symbol: live.symbol.clone(),
                fingerprint_id: live.fingerprint_id.clone(),
                bucket: live.momentum_bucket.value(),
                price: live.current_price,
                ttc_seconds: live.ttc_seconds,
                strike: p.strike,
                direction: p.direction,
                move_percent: p.move_percent,
                prob_beyond: p.prob_beyond,
                prob_within: p.prob_within,
            })
            .collect()
    }
}

/// Probability record schema
pub fn probability_schema() -> Schema {
    Schema::new(vec![
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("symbol", DataType::Utf8, false),
        Field::new("fingerprint_id", DataType::Utf8, false),
        Field::new("bucket", DataType::Int8, false),
        Field::new("price", DataType::Utf8, false), // Decimal kept exact as text
        Field::new("ttc_seconds", DataType::Int64, false),
        Field::new("strike", DataType::Utf8, false),
        Field::new("direction", DataType::Utf8, false),
        Field::new("move_pct", DataType::Float64, false),
        Field::new("prob_beyond", DataType::Float64, false),
        Field::new("prob_within", DataType::Float64, false),
    ])
}

fn direction_label(direction: StrikeSide) -> &'static str {
    match direction {
        StrikeSide::Above => "above",
        StrikeSide::Below => "below",
    }
}

fn parse_direction(label: &str) -> anyhow::Result<StrikeSide> {
    match label {
        "above" => Ok(StrikeSide::Above),
        "below" => Ok(StrikeSide::Below),
        other => anyhow::bail!("Invalid direction {:?}", other),
    }
}

/// Parquet writer with time-based rotation.
///
/// Files are grouped by rotation window: every flush inside one window gets
/// the window's start time in its name plus a sequence number.
pub struct ParquetWriter {
    output_dir: PathBuf,
    rotation_interval: Duration,
    current_window: Option<DateTime<Utc>>,
    sequence: u32,
}

impl ParquetWriter {
    pub fn new(output_dir: PathBuf, rotation_interval_secs: u64) -> Self {
        Self {
            output_dir,
            rotation_interval: Duration::seconds(rotation_interval_secs.max(1) as i64),
            current_window: None,
            sequence: 0,
        }
    }

    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Check if a new window should start at `now`
    pub fn needs_rotation(&self, now: DateTime<Utc>) -> bool {
        match self.current_window {
            None => true,
            Some(start) => now - start >= self.rotation_interval,
        }
    }

    /// Start a new window at `timestamp`
    pub fn mark_rotation(&mut self, timestamp: DateTime<Utc>) {
        self.current_window = Some(timestamp);
        self.sequence = 0;
    }

    /// Path for a window start and sequence number
    pub fn file_path(&self, prefix: &str, window: DateTime<Utc>, sequence: u32) -> PathBuf {
        let filename = format!(
            "{}_{}_{:04}.parquet",
            prefix,
            window.format("%Y%m%d_%H%M%S"),
            sequence
        );
        self.output_dir.join(filename)
    }

    /// Path for the next flush at `now`, rotating if the window expired
    pub fn next_path(&mut self, prefix: &str, now: DateTime<Utc>) -> PathBuf {
        if self.needs_rotation(now) {
            self.mark_rotation(now);
        }
        let window = self.current_window.unwrap_or(now);
        let path = self.file_path(prefix, window, self.sequence);
        self.sequence += 1;
        path
    }

    /// Write probability records to a Parquet file
    pub fn write_probabilities(
        &self,
        path: &Path,
        records: &[ProbabilityRecord],
    ) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        self.ensure_dir()?;

        let schema = Arc::new(probability_schema());
        let file = File::create(path)?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        let timestamps: Vec<i64> = records
            .iter()
            .map(|r| r.timestamp.timestamp_micros())
            .collect();
        let symbols: Vec<&str> = records.iter().map(|r| r.symbol.as_str()).collect();
        let fingerprints: Vec<&str> = records.iter().map(|r| r.fingerprint_id.as_str()).collect();
        let buckets: Vec<i8> = records.iter().map(|r| r.bucket).collect();
        let prices: Vec<String> = records.iter().map(|r| r.price.to_string()).collect();
        let ttcs: Vec<i64> = records.iter().map(|r| r.ttc_seconds).collect();
        let strikes: Vec<String> = records.iter().map(|r| r.strike.to_string()).collect();
        let directions: Vec<&str> = records.iter().map(|r| direction_label(r.direction)).collect();
        let moves: Vec<f64> = records.iter().map(|r| r.move_percent).collect();
        let beyond: Vec<f64> = records.iter().map(|r| r.prob_beyond).collect();
        let within: Vec<f64> = records.iter().map(|r| r.prob_within).collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC"))
                    as ArrayRef,
                Arc::new(StringArray::from(symbols)) as ArrayRef,
                Arc::new(StringArray::from(fingerprints)) as ArrayRef,
                Arc::new(Int8Array::from(buckets)) as ArrayRef,
                Arc::new(StringArray::from(prices)) as ArrayRef,
                Arc::new(Int64Array::from(ttcs)) as ArrayRef,
                Arc::new(StringArray::from(strikes)) as ArrayRef,
                Arc::new(StringArray::from(directions)) as ArrayRef,
                Arc::new(Float64Array::from(moves)) as ArrayRef,
                Arc::new(Float64Array::from(beyond)) as ArrayRef,
                Arc::new(Float64Array::from(within)) as ArrayRef,
            ],
        )?;

        writer.write(&batch)?;
        writer.close()?;

        Ok(())
    }
}

/// Reads probability records back from a Parquet file
pub struct ParquetReader {
    path: PathBuf,
}

macro_rules! column {
    ($batch:expr, $idx:expr, $ty:ty, $name:literal) => {
        $batch
            .column($idx)
            .as_any()
            .downcast_ref::<$ty>()
            .ok_or_else(|| anyhow::anyhow!(concat!("Invalid ", $name, " column")))?
    };
}

impl ParquetReader {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_probabilities(&self) -> anyhow::Result<Vec<ProbabilityRecord>> {
        let file = File::open(&self.path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut records = Vec::new();

        for batch_result in reader {
            let batch = batch_result?;

            let timestamps = column!(batch, 0, TimestampMicrosecondArray, "timestamp");
            let symbols = column!(batch, 1, StringArray, "symbol");
            let fingerprints = column!(batch, 2, StringArray, "fingerprint_id");
            let buckets = column!(batch, 3, Int8Array, "bucket");
            let prices = column!(batch, 4, StringArray, "price");
            let ttcs = column!(batch, 5, Int64Array, "ttc_seconds");
            let strikes = column!(batch, 6, StringArray, "strike");
            let directions = column!(batch, 7, StringArray, "direction");
            let moves = column!(batch, 8, Float64Array, "move_pct");
            let beyond = column!(batch, 9, Float64Array, "prob_beyond");
            let within = column!(batch, 10, Float64Array, "prob_within");

            for i in 0..batch.num_rows() {
                let timestamp = DateTime::from_timestamp_micros(timestamps.value(i))
                    .ok_or_else(|| anyhow::anyhow!("Invalid timestamp"))?;

                records.push(ProbabilityRecord {
                    timestamp,
                    symbol: symbols.value(i).to_string(),
                    fingerprint_id: fingerprints.value(i).to_string(),
                    bucket: buckets.value(i),
                    price: Decimal::from_str(prices.value(i))?,
                    ttc_seconds: ttcs.value(i),
                    strike: Decimal::from_str(strikes.value(i))?,
                    direction: parse_direction(directions.value(i))?,
                    move_percent: moves.value(i),
                    prob_beyond: beyond.value(i),
                    prob_within: within.value(i),
                });
            }
        }

        Ok(records)
    }
}
