use std::path::PathBuf;

use thiserror::Error;

/// Why a payload from the snapshot endpoint could not be used.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to parse snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot is missing the `{0}` section")]
    Incomplete(&'static str),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access play store at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Play store at {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize plays: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Play store lock poisoned")]
    Poisoned,
}
