use std::sync::Mutex;

use crate::error::StoreError;
use crate::record::PlayRecord;

/// Durable, append-only collection of committed plays.
pub trait PlayStore: Send + Sync {
    /// All records in insertion order.
    fn list(&self) -> Result<Vec<PlayRecord>, StoreError>;

    fn append(&self, record: &PlayRecord) -> Result<(), StoreError>;

    /// Remove a record by id. Returns false when no such record exists.
    fn remove(&self, id: &str) -> Result<bool, StoreError>;

    /// The last `n` records in insertion order.
    fn recent(&self, n: usize) -> Result<Vec<PlayRecord>, StoreError> {
        let mut plays = self.list()?;
        let skip = plays.len().saturating_sub(n);
        Ok(plays.split_off(skip))
    }
}

/// Store kept entirely in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryPlayStore {
    plays: Mutex<Vec<PlayRecord>>,
}

impl MemoryPlayStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlayStore for MemoryPlayStore {
    fn list(&self) -> Result<Vec<PlayRecord>, StoreError> {
        let plays = self.plays.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(plays.clone())
    }

    fn append(&self, record: &PlayRecord) -> Result<(), StoreError> {
        let mut plays = self.plays.lock().map_err(|_| StoreError::Poisoned)?;
        plays.push(record.clone());
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let mut plays = self.plays.lock().map_err(|_| StoreError::Poisoned)?;
        let before = plays.len();
        plays.retain(|p| p.id != id);
        Ok(plays.len() != before)
    }
}
