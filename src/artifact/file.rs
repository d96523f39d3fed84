//! File-backed artifact repository
//!
//! Documents live at `<dir>/<symbol>_live_probabilities.json` and
//! `<dir>/<symbol>_strike_table.json`. Writes go to a sibling temp file that
//! is synced and then renamed over the target, so readers only ever see a
//! complete old or new document.

use super::types::{ArtifactError, LiveProbabilities, StrikeTableSnapshot};
use super::ArtifactRepository;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Artifact repository writing JSON files into one directory
#[derive(Debug, Clone)]
pub struct FileArtifactRepository {
    dir: PathBuf,
}

impl FileArtifactRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn live_probabilities_path(&self, symbol: &str) -> PathBuf {
        self.dir
            .join(format!("{}_live_probabilities.json", symbol.to_lowercase()))
    }

    pub fn strike_table_path(&self, symbol: &str) -> PathBuf {
        self.dir
            .join(format!("{}_strike_table.json", symbol.to_lowercase()))
    }

    async fn put<T: Serialize>(&self, path: PathBuf, doc: &T) -> Result<(), ArtifactError> {
        let payload = serde_json::to_vec_pretty(doc)?;
        tokio::task::spawn_blocking(move || write_atomic(&path, &payload))
            .await
            .map_err(|e| ArtifactError::Task(e.to_string()))?
    }

    async fn get<T: DeserializeOwned + Send + 'static>(
        &self,
        path: PathBuf,
    ) -> Result<Option<T>, ArtifactError> {
        tokio::task::spawn_blocking(move || read_json(&path))
            .await
            .map_err(|e| ArtifactError::Task(e.to_string()))?
    }
}

/// Replace `target` with `payload` via temp file, fsync and rename. Each
/// call writes its own temp file, which is removed if any step fails.
pub fn write_atomic(target: &Path, payload: &[u8]) -> Result<(), ArtifactError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let tmp = temp_path(target);
    let result = write_and_rename(&tmp, target, payload);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_and_rename(tmp: &Path, target: &Path, payload: &[u8]) -> Result<(), ArtifactError> {
    {
        let mut file = File::create(tmp).map_err(io_err(tmp))?;
        file.write_all(payload).map_err(io_err(tmp))?;
        file.sync_all().map_err(io_err(tmp))?;
    }
    fs::rename(tmp, target).map_err(io_err(target))
}

/// Sibling temp path unique to this process and call
fn temp_path(target: &Path) -> PathBuf {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.{}-{}.tmp", name, std::process::id(), seq))
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError {
    let path = path.to_path_buf();
    move |source| ArtifactError::Io { path, source }
}

/// Read a JSON document, `None` if the file does not exist
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ArtifactError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|source| ArtifactError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

#[async_trait]
impl ArtifactRepository for FileArtifactRepository {
    async fn put_live_probabilities(&self, doc: &LiveProbabilities) -> Result<(), ArtifactError> {
        self.put(self.live_probabilities_path(&doc.symbol), doc).await
    }

    async fn put_strike_table(&self, doc: &StrikeTableSnapshot) -> Result<(), ArtifactError> {
        self.put(self.strike_table_path(&doc.symbol), doc).await
    }

    async fn live_probabilities(
        &self,
        symbol: &str,
    ) -> Result<Option<LiveProbabilities>, ArtifactError> {
        self.get(self.live_probabilities_path(symbol)).await
    }

    async fn strike_table(&self, symbol: &str) -> Result<Option<StrikeTableSnapshot>, ArtifactError> {
        self.get(self.strike_table_path(symbol)).await
    }
}
