//! Debounced JSON persistence for the tracker store.
//!
//! `schedule_save()` only wakes a background task. The task waits one debounce
//! window from the first pending request, coalescing any requests that arrive
//! meanwhile, then snapshots the store under a read lock and writes the file
//! atomically (temp file in the same directory, then rename). A steady stream
//! of requests still produces a write every window, so a crash can lose at
//! most the last window.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::infrastructure::ports::PersistencePort;
use crate::stores::{TrackerState, TrackerStore};

/// File store errors. Background saves only log these.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PersistenceError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read a persisted store. A missing file yields an empty store.
pub async fn read_state(path: &Path) -> Result<TrackerState, PersistenceError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No store file yet, starting empty");
            Ok(TrackerState::default())
        }
        Err(e) => Err(PersistenceError::io(path, e)),
    }
}

/// Write bytes to `path` via a sibling temp file and rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PersistenceError::io(parent, e))?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "store".into());
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|e| PersistenceError::io(&tmp_path, e))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| PersistenceError::io(path, e))?;
    Ok(())
}

struct SaverInner {
    store: TrackerStore,
    path: PathBuf,
    /// Serializes background writes with explicit flushes.
    write_lock: Mutex<()>,
}

impl SaverInner {
    async fn write_now(&self) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let bytes = self
            .store
            .read(|state| serde_json::to_vec_pretty(state))
            .await?;
        write_atomic(&self.path, &bytes).await?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "Store saved");
        Ok(())
    }
}

/// Debounced writer implementing [`PersistencePort`].
pub struct DebouncedJsonSaver {
    inner: Arc<SaverInner>,
    notify: Arc<Notify>,
}

impl DebouncedJsonSaver {
    /// Create the saver and spawn its background task. Must be called inside
    /// a Tokio runtime.
    pub fn spawn(store: TrackerStore, path: PathBuf, debounce: Duration) -> Self {
        let inner = Arc::new(SaverInner {
            store,
            path,
            write_lock: Mutex::new(()),
        });
        let notify = Arc::new(Notify::new());

        let task_inner = inner.clone();
        let task_notify = notify.clone();
        tokio::spawn(async move {
            loop {
                task_notify.notified().await;
                // The window is measured from the first pending request and is
                // not extended by later ones.
                tokio::time::sleep_until(Instant::now() + debounce).await;
                if let Err(e) = task_inner.write_now().await {
                    tracing::error!(
                        path = %task_inner.path.display(),
                        error = %e,
                        "Failed to save tracker store"
                    );
                }
            }
        });

        Self { inner, notify }
    }

    /// Write immediately, bypassing the debounce window.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        self.inner.write_now().await
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

impl PersistencePort for DebouncedJsonSaver {
    fn schedule_save(&self) {
        self.notify.notify_one();
    }
}
