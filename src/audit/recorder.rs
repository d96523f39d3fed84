//! Background recorder for probability audit records

use super::parquet::{ParquetWriter, ProbabilityRecord, PROBABILITY_PREFIX};
use crate::artifact::LiveProbabilities;
use crate::config::AuditConfig;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, error, info, warn};

/// Configuration for probability recording
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Output directory for Parquet files
    pub output_dir: PathBuf,
    /// Rotation interval in seconds
    pub rotation_interval_secs: u64,
    /// Buffered records before flushing
    pub buffer_size: usize,
    /// Maximum time between flushes
    pub flush_interval_secs: u64,
    /// Pending batches before new ones are dropped
    pub channel_capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./data/audit"),
            rotation_interval_secs: 3600, // 1 hour
            buffer_size: 1000,
            flush_interval_secs: 60,
            channel_capacity: 1024,
        }
    }
}

impl From<&AuditConfig> for RecorderConfig {
    fn from(config: &AuditConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            rotation_interval_secs: config.rotation_interval_secs,
            buffer_size: config.buffer_size,
            flush_interval_secs: config.flush_interval_secs,
            ..Default::default()
        }
    }
}

/// Recording statistics
#[derive(Debug, Default, Clone)]
pub struct RecorderStats {
    pub records_received: u64,
    pub records_written: u64,
    pub batches_dropped: u64,
    pub files_written: u64,
    pub last_flush: Option<DateTime<Utc>>,
}

enum RecorderCommand {
    Records(Vec<ProbabilityRecord>),
    Flush(oneshot::Sender<()>),
}

/// Buffers probability records and flushes them to Parquet off the hot path
#[derive(Clone)]
pub struct ProbabilityRecorder {
    tx: mpsc::Sender<RecorderCommand>,
    stats: Arc<RwLock<RecorderStats>>,
}

impl ProbabilityRecorder {
    /// Create a recorder and spawn its writer task
    pub fn new(config: RecorderConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let stats = Arc::new(RwLock::new(RecorderStats::default()));

        let writer = ParquetWriter::new(config.output_dir.clone(), config.rotation_interval_secs);
        let writer_stats = stats.clone();
        tokio::spawn(async move {
            Self::run_writer(rx, writer, config, writer_stats).await;
        });

        Self { tx, stats }
    }

    /// Queue one record per strike of `live`. Never waits; a full queue drops
    /// the batch with a warning.
    pub async fn record(&self, live: &LiveProbabilities) {
        let records = ProbabilityRecord::from_live(live);
        if records.is_empty() {
            return;
        }

        match self.tx.try_send(RecorderCommand::Records(records)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(symbol = %live.symbol, "Audit queue full, dropping batch");
                self.stats.write().await.batches_dropped += 1;
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(symbol = %live.symbol, "Audit writer stopped, dropping batch");
                self.stats.write().await.batches_dropped += 1;
            }
        }
    }

    /// Write everything buffered so far and wait for it to land
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(RecorderCommand::Flush(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
    }

    pub async fn stats(&self) -> RecorderStats {
        self.stats.read().await.clone()
    }

    async fn run_writer(
        mut rx: mpsc::Receiver<RecorderCommand>,
        mut writer: ParquetWriter,
        config: RecorderConfig,
        stats: Arc<RwLock<RecorderStats>>,
    ) {
        let mut buffer: Vec<ProbabilityRecord> = Vec::with_capacity(config.buffer_size);
        let mut ticker = tokio::time::interval(tokio::time::Duration::from_secs(
            config.flush_interval_secs.max(1),
        ));
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                command = rx.recv() => {
                    match command {
                        Some(RecorderCommand::Records(records)) => {
                            stats.write().await.records_received += records.len() as u64;
                            buffer.extend(records);

                            if buffer.len() >= config.buffer_size {
                                Self::flush_buffer(&mut buffer, &mut writer, &stats).await;
                            }
                        }
                        Some(RecorderCommand::Flush(done)) => {
                            Self::flush_buffer(&mut buffer, &mut writer, &stats).await;
                            let _ = done.send(());
                        }
                        None => {
                            Self::flush_buffer(&mut buffer, &mut writer, &stats).await;
                            info!("Audit writer shutting down");
                            break;
                        }
                    }
                }

                _ = ticker.tick() => {
                    Self::flush_buffer(&mut buffer, &mut writer, &stats).await;
                }
            }
        }
    }

    async fn flush_buffer(
        buffer: &mut Vec<ProbabilityRecord>,
        writer: &mut ParquetWriter,
        stats: &Arc<RwLock<RecorderStats>>,
    ) {
        if buffer.is_empty() {
            return;
        }

        let now = Utc::now();
        let path = writer.next_path(PROBABILITY_PREFIX, now);
        let count = buffer.len();

        match writer.write_probabilities(&path, buffer) {
            Ok(()) => {
                let mut s = stats.write().await;
                s.records_written += count as u64;
                s.files_written += 1;
                s.last_flush = Some(now);
                debug!(count, path = ?path, "Flushed probability records");
            }
            Err(e) => {
                error!(error = %e, path = ?path, "Failed to write probability records");
            }
        }

        buffer.clear();
    }
}
