//! File-backed document store.
//!
//! The whole dataset lives in one JSON document. Every mutation goes through
//! [`Store::read_modify_write`], which holds the write lock across the full
//! load-apply-persist sequence, so id assignment and uniqueness checks are
//! race-free. Reads take the read lock and may run concurrently with each
//! other, never with a writer.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::info;

use roost_types::Dataset;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store document is corrupt: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    LockPoisoned,
}

pub struct Store {
    path: PathBuf,
    // Guards the file itself; the unit value carries no data.
    lock: RwLock<()>,
}

impl Store {
    /// Opens the store, creating the backing file with an empty document if
    /// it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.exists() {
            let mut file = File::create(&path)?;
            file.write_all(b"{}")?;
            file.sync_all()?;
            info!("created empty database at {}", path.display());
        }
        Ok(Self {
            path,
            lock: RwLock::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current durable state. Absent or empty file reads as the
    /// empty dataset.
    pub fn load(&self) -> Result<Dataset, StoreError> {
        let _guard = self.lock.read().map_err(|_| StoreError::LockPoisoned)?;
        self.read_dataset()
    }

    /// The one mutation primitive: load, apply `f`, persist — all under the
    /// write lock. `f` may fail, in which case nothing is written.
    ///
    /// There is deliberately no way to read the dataset, decide a value
    /// outside the lock, and write it back; `f` must compute everything it
    /// needs (ids included) from the dataset it is handed.
    pub fn read_modify_write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Dataset) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.lock.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut dataset = self.read_dataset()?;
        let out = f(&mut dataset)?;
        self.write_dataset(&dataset)?;
        Ok(out)
    }

    /// Destructive reset: replaces the document with an empty dataset.
    /// Intended for test/debug bootstrap only.
    pub fn reset(&self) -> Result<(), StoreError> {
        let _guard = self.lock.write().map_err(|_| StoreError::LockPoisoned)?;
        self.write_dataset(&Dataset::default())?;
        info!("database reset to empty at {}", self.path.display());
        Ok(())
    }

    fn read_dataset(&self) -> Result<Dataset, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Dataset::default()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Dataset::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    /// Serializes to a sibling temp file and renames into place, so a crash
    /// mid-write never leaves a truncated document.
    fn write_dataset(&self, dataset: &Dataset) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(dataset)?;

        let mut tmp_name = self.path.clone().into_os_string();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
