//! # playlog-core
//!
//! Reconstructs discrete play sessions from a noisy stream of game-state
//! snapshots.
//!
//! ## Key Types
//!
//! - [`Snapshot`] - One observation from the memory reader
//! - [`SessionEngine`] - Boundary detection and live statistics
//! - [`NoiseFilter`] - Ghost, speed and duplicate rejection
//! - [`Tracker`] - Wires engine, filter and [`PlayStore`] to the stream

mod config;
mod engine;
mod error;
mod filter;
mod finalizer;
mod record;
mod session;
mod snapshot;
mod stats;
mod store;
mod tracker;

pub use config::{FilterThresholds, SessionThresholds};
pub use engine::{EngineState, SessionEngine};
pub use error::{SnapshotError, StoreError};
pub use filter::{NoiseFilter, Rejection};
pub use finalizer::finalize;
pub use record::{PlayRecord, PlayStatus};
pub use session::{Session, SessionMode};
pub use snapshot::{Beatmap, Gameplay, HitCounts, MenuState, Mods, ResultsScreen, Snapshot};
pub use stats::LiveStats;
pub use store::{MemoryPlayStore, PlayStore};
pub use tracker::{ConnectionStatus, Disposition, StreamMessage, Tracker, TrackerEvent};
