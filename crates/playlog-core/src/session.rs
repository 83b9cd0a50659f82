use chrono::{DateTime, Utc};

use crate::snapshot::{Beatmap, Mods, Snapshot};
use crate::stats::LiveStats;

/// How an open session is being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// The logged-in player is playing. `failed` latches once health hits zero.
    Normal { failed: bool },
    /// Someone else's play (replay or spectate). Never produces a record.
    Replay,
}

/// An attempt at a beatmap, open between two boundary transitions.
#[derive(Debug, Clone)]
pub struct Session {
    pub started_at: DateTime<Utc>,
    pub beatmap: Beatmap,
    pub mods: Mods,
    pub mode: SessionMode,
    pub stats: LiveStats,
}

impl Session {
    pub fn open(snapshot: &Snapshot, now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            beatmap: snapshot.beatmap.clone(),
            mods: snapshot.mods.clone(),
            mode: SessionMode::Normal { failed: false },
            stats: LiveStats::new(),
        }
    }

    pub fn is_replay(&self) -> bool {
        self.mode == SessionMode::Replay
    }

    pub fn has_failed(&self) -> bool {
        matches!(self.mode, SessionMode::Normal { failed: true })
    }

    /// Once a replay, always a replay.
    pub fn mark_replay(&mut self) {
        self.mode = SessionMode::Replay;
    }

    /// Latch the fail flag. No effect on replays or already failed sessions.
    pub fn latch_fail(&mut self) {
        if let SessionMode::Normal { failed } = &mut self.mode {
            *failed = true;
        }
    }
}
