//! Export watermark: the instant up to which data has been exported.
//!
//! The watermark only moves forward. The file-backed store survives restarts;
//! the memory store starts at process launch.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Current watermark.
    fn current(&self) -> DateTime<Utc>;

    /// Moves the watermark to `to` if it is later than the current value.
    async fn advance(&self, to: DateTime<Utc>) -> Result<()>;
}

/// Process-lifetime watermark.
pub struct MemoryWatermark {
    value: Mutex<DateTime<Utc>>,
}

impl MemoryWatermark {
    pub fn new(initial: DateTime<Utc>) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }

    /// Starts at the current instant.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermark {
    fn current(&self) -> DateTime<Utc> {
        *self.value.lock()
    }

    async fn advance(&self, to: DateTime<Utc>) -> Result<()> {
        let mut value = self.value.lock();
        if to > *value {
            *value = to;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Checkpoint {
    last_export_time: DateTime<Utc>,
}

/// Watermark persisted as a small JSON checkpoint file.
pub struct FileWatermark {
    path: PathBuf,
    value: Mutex<DateTime<Utc>>,
}

impl FileWatermark {
    /// Restores the checkpoint at `path`, or starts at `fallback` if there is
    /// none or it cannot be read.
    pub async fn open(path: impl Into<PathBuf>, fallback: DateTime<Utc>) -> Self {
        let path = path.into();
        let initial = match read_checkpoint(&path).await {
            Ok(Some(at)) => {
                info!(path = %path.display(), watermark = %at, "Restored export watermark");
                at
            }
            Ok(None) => fallback,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable export watermark, starting fresh");
                fallback
            }
        };

        Self {
            path,
            value: Mutex::new(initial),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn read_checkpoint(path: &Path) -> Result<Option<DateTime<Utc>>> {
    match tokio::fs::read(path).await {
        Ok(raw) => {
            let checkpoint: Checkpoint = serde_json::from_slice(&raw)?;
            Ok(Some(checkpoint.last_export_time))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(engine_core::Error::internal(format!("Read error: {}", e))),
    }
}

async fn write_checkpoint(path: &Path, at: DateTime<Utc>) -> Result<()> {
    let body = serde_json::to_vec_pretty(&Checkpoint {
        last_export_time: at,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| engine_core::Error::internal(format!("Create dir error: {}", e)))?;
    }

    // Replace atomically so a crash never leaves a torn checkpoint.
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, body)
        .await
        .map_err(|e| engine_core::Error::internal(format!("Write error: {}", e)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| engine_core::Error::internal(format!("Rename error: {}", e)))?;
    Ok(())
}

#[async_trait]
impl WatermarkStore for FileWatermark {
    fn current(&self) -> DateTime<Utc> {
        *self.value.lock()
    }

    /// The in-memory value advances even if persisting fails.
    async fn advance(&self, to: DateTime<Utc>) -> Result<()> {
        {
            let mut value = self.value.lock();
            if to <= *value {
                return Ok(());
            }
            *value = to;
        }
        write_checkpoint(&self.path, to).await
    }
}
