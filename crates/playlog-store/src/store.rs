use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use playlog_core::{PlayRecord, PlayStore, StoreError};

use crate::types::PlayFilter;

/// Committed plays kept as a single JSON array on disk.
///
/// Every write rewrites the whole document through a sibling temp file and a
/// rename, so a reader sees either the old or the new array.
pub struct JsonPlayStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonPlayStore {
    /// Create a store at the default location, `<data_dir>/playlog/plays.json`.
    pub fn new() -> Result<Self> {
        let data_dir = dirs::data_dir().with_context(|| "Could not determine data directory")?;
        Ok(Self::with_path(data_dir.join("playlog").join("plays.json")))
    }

    /// Create a store backed by an explicit file (useful for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a single play by id.
    pub fn get(&self, id: &str) -> Result<Option<PlayRecord>, StoreError> {
        Ok(self.list()?.into_iter().find(|p| p.id == id))
    }

    /// Plays matching `filter`, newest first.
    pub fn list_filtered(&self, filter: &PlayFilter) -> Result<Vec<PlayRecord>, StoreError> {
        let mut plays: Vec<PlayRecord> = self
            .list()?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();
        plays.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(plays)
    }

    fn read(&self) -> Result<Vec<PlayRecord>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, plays: &[PlayRecord]) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(plays)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl PlayStore for JsonPlayStore {
    fn list(&self) -> Result<Vec<PlayRecord>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        self.read()
    }

    fn append(&self, record: &PlayRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut plays = self.read()?;
        plays.push(record.clone());
        self.write(&plays)?;
        tracing::debug!(id = %record.id, total = plays.len(), "Appended play");
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut plays = self.read()?;
        let before = plays.len();
        plays.retain(|p| p.id != id);
        if plays.len() == before {
            return Ok(false);
        }
        self.write(&plays)?;
        Ok(true)
    }
}
