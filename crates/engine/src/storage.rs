use crate::{EngineError, Result};
use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use watchword_protocol::{ActivityRecord, LogEntry, ACTIVITY_STORAGE_KEY, LOG_STORAGE_KEY};

/// Asynchronous key-value persistence boundary. Two keys exist: the bounded
/// log (read and rewritten whole) and the single activity record.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// The persisted log, newest first. An absent or malformed value reads
    /// as empty; only a store-level failure is an error.
    async fn read_log(&self) -> Result<Vec<LogEntry>>;

    async fn write_log(&self, entries: &[LogEntry]) -> Result<()>;

    async fn read_activity(&self) -> Result<Option<ActivityRecord>>;

    async fn write_activity(&self, record: &ActivityRecord) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    log: Vec<LogEntry>,
    activity: Option<ActivityRecord>,
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn read_log(&self) -> Result<Vec<LogEntry>> {
        Ok(self.state.lock().await.log.clone())
    }

    async fn write_log(&self, entries: &[LogEntry]) -> Result<()> {
        self.state.lock().await.log = entries.to_vec();
        Ok(())
    }

    async fn read_activity(&self) -> Result<Option<ActivityRecord>> {
        Ok(self.state.lock().await.activity.clone())
    }

    async fn write_activity(&self, record: &ActivityRecord) -> Result<()> {
        self.state.lock().await.activity = Some(record.clone());
        Ok(())
    }
}

/// File-backed store: one JSON file per storage key under a state directory.
/// Writes go through a temp file and rename so a crash never leaves a
/// half-written value.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    async fn read_key(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.key_path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(EngineError::Storage(format!(
                "read {} failed: {err}",
                path.display()
            ))),
        }
    }

    async fn write_key(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.key_path(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn read_log(&self) -> Result<Vec<LogEntry>> {
        let Some(bytes) = self.read_key(LOG_STORAGE_KEY).await? else {
            return Ok(Vec::new());
        };
        // A value that is not a valid entry array reads as empty, the same
        // tolerance the persisted-snapshot check always had.
        match serde_json::from_slice(&bytes) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                debug!("ignoring malformed persisted log: {err}");
                Ok(Vec::new())
            }
        }
    }

    async fn write_log(&self, entries: &[LogEntry]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        self.write_key(LOG_STORAGE_KEY, bytes).await
    }

    async fn read_activity(&self) -> Result<Option<ActivityRecord>> {
        let Some(bytes) = self.read_key(ACTIVITY_STORAGE_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                debug!("ignoring malformed activity record: {err}");
                Ok(None)
            }
        }
    }

    async fn write_activity(&self, record: &ActivityRecord) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(record)?;
        self.write_key(ACTIVITY_STORAGE_KEY, bytes).await
    }
}
