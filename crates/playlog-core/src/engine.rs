use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::SessionThresholds;
use crate::finalizer::finalize;
use crate::record::{PlayRecord, PlayStatus};
use crate::session::Session;
use crate::snapshot::{MenuState, Snapshot};

/// Whether a session is currently open.
#[derive(Debug, Clone)]
pub enum EngineState {
    Idle,
    Active(Session),
}

/// Reconstructs play sessions from the snapshot stream.
///
/// Feed every snapshot, in arrival order, through [`SessionEngine::handle`].
/// A returned record is a candidate that still has to pass the noise filter.
#[derive(Debug)]
pub struct SessionEngine {
    thresholds: SessionThresholds,
    state: EngineState,
    last_menu_state: Option<MenuState>,
}

impl Default for SessionEngine {
    fn default() -> Self {
        Self::new(SessionThresholds::default())
    }
}

impl SessionEngine {
    pub fn new(thresholds: SessionThresholds) -> Self {
        Self {
            thresholds,
            state: EngineState::Idle,
            last_menu_state: None,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            EngineState::Active(session) => Some(session),
            EngineState::Idle => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, EngineState::Active(_))
    }

    /// Process one snapshot. Returns a record when a session was closed with
    /// an outcome worth keeping.
    pub fn handle(&mut self, snapshot: &Snapshot, now: DateTime<Utc>) -> Option<PlayRecord> {
        let current = snapshot.menu_state;
        let was_playing = self
            .last_menu_state
            .replace(current)
            .is_some_and(MenuState::is_playing);

        if current.is_playing() {
            if !was_playing {
                self.open(snapshot, now);
            }
            return self.update(snapshot, now);
        }

        if !was_playing {
            return None;
        }

        if current.is_results() {
            self.finish_pass(snapshot, now)
        } else if current.leaves_play() {
            self.finish_unfinished(now)
        } else {
            None
        }
    }

    /// Drop any open session without producing a record.
    pub fn abandon(&mut self) {
        if let EngineState::Active(session) = std::mem::replace(&mut self.state, EngineState::Idle) {
            debug!(title = %session.beatmap.title, "Abandoning open session");
        }
    }

    fn open(&mut self, snapshot: &Snapshot, now: DateTime<Utc>) {
        if let EngineState::Active(previous) = &self.state {
            debug!(title = %previous.beatmap.title, "Discarding unterminated session");
        }

        let mut session = Session::open(snapshot, now);
        if snapshot.is_foreign_player() {
            info!(
                player = snapshot.gameplay.player_name.as_deref().unwrap_or_default(),
                "Replay detected at session start"
            );
            session.mark_replay();
        }

        info!(
            title = %session.beatmap.title,
            difficulty = %session.beatmap.difficulty,
            mods = %session.mods,
            "Session opened"
        );
        self.state = EngineState::Active(session);
    }

    fn update(&mut self, snapshot: &Snapshot, now: DateTime<Utc>) -> Option<PlayRecord> {
        let EngineState::Active(session) = &mut self.state else {
            return None;
        };

        if session.is_replay() {
            return None;
        }
        if snapshot.is_foreign_player() {
            info!(
                player = snapshot.gameplay.player_name.as_deref().unwrap_or_default(),
                "Replay detected mid-session"
            );
            session.mark_replay();
            return None;
        }

        let gameplay = &snapshot.gameplay;
        if session.stats.time_ms > self.thresholds.retry_progress_ms
            && gameplay.time_ms < self.thresholds.retry_restart_ms
            && gameplay.score == 0
        {
            info!(
                from_ms = session.stats.time_ms,
                to_ms = gameplay.time_ms,
                "Retry detected"
            );
            let status = Self::unfinished_status(session);
            let record = self.close(status, None, now);
            self.open(snapshot, now);
            return record;
        }

        if !snapshot.mods.is_empty() {
            session.mods = snapshot.mods.clone();
        }

        session
            .stats
            .observe(gameplay, self.thresholds.slider_break_combo_floor);

        let health_depleted = gameplay.hp.is_some_and(|hp| hp <= 0.0);
        if !session.mods.contains("NF") && health_depleted && session.stats.score > 0 {
            if !session.has_failed() {
                debug!(title = %session.beatmap.title, "Fail latched");
            }
            session.latch_fail();
        }

        None
    }

    fn finish_pass(&mut self, snapshot: &Snapshot, now: DateTime<Utc>) -> Option<PlayRecord> {
        let EngineState::Active(session) = &self.state else {
            return None;
        };

        if let Some(played_at) = snapshot.result_time() {
            let tolerance = chrono::Duration::from_std(self.thresholds.stale_results_tolerance)
                .unwrap_or_else(|_| chrono::Duration::zero());
            let earliest = session.started_at - tolerance;
            if played_at < earliest {
                info!(
                    %played_at,
                    started_at = %session.started_at,
                    "Ignoring stale results screen"
                );
                self.state = EngineState::Idle;
                return None;
            }
        }

        self.close(PlayStatus::Pass, Some(snapshot), now)
    }

    fn finish_unfinished(&mut self, now: DateTime<Utc>) -> Option<PlayRecord> {
        let EngineState::Active(session) = &self.state else {
            return None;
        };
        let status = Self::unfinished_status(session);
        self.close(status, None, now)
    }

    fn unfinished_status(session: &Session) -> PlayStatus {
        if session.has_failed() {
            PlayStatus::Fail
        } else {
            PlayStatus::Quit
        }
    }

    fn close(
        &mut self,
        status: PlayStatus,
        terminal: Option<&Snapshot>,
        now: DateTime<Utc>,
    ) -> Option<PlayRecord> {
        let EngineState::Active(session) = std::mem::replace(&mut self.state, EngineState::Idle)
        else {
            return None;
        };

        if session.is_replay() {
            debug!(title = %session.beatmap.title, "Dropping replay session");
            return None;
        }

        let record = finalize(session, status, terminal.map(|s| &s.gameplay), now);
        info!(
            title = %record.map_title,
            status = %record.status,
            score = record.score,
            duration_secs = record.duration_seconds,
            "Session closed"
        );
        Some(record)
    }
}
