use thiserror::Error;

use crate::config::FilterThresholds;
use crate::record::{PlayRecord, PlayStatus};

/// Why a finalized play was discarded instead of committed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("zero-score quit (ghost session)")]
    GhostSession,

    #[error("impossible speed ({hits_per_second:.1} hits/s), likely a replay")]
    ImpossibleSpeed { hits_per_second: f64 },

    #[error("duplicate of play {existing_id}")]
    Duplicate { existing_id: String },
}

/// Rejection predicates applied to a candidate record before it is stored.
#[derive(Debug, Clone, Default)]
pub struct NoiseFilter {
    thresholds: FilterThresholds,
}

impl NoiseFilter {
    pub fn new(thresholds: FilterThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &FilterThresholds {
        &self.thresholds
    }

    /// Check `candidate` against every predicate, stopping at the first hit.
    ///
    /// `recent` is the tail of the store in insertion order; only the last
    /// `duplicate_window` entries are consulted.
    pub fn check(&self, candidate: &PlayRecord, recent: &[PlayRecord]) -> Result<(), Rejection> {
        self.check_record(candidate)?;
        self.check_duplicate(candidate, recent)
    }

    /// The predicates that need nothing but the candidate itself.
    pub fn check_record(&self, candidate: &PlayRecord) -> Result<(), Rejection> {
        self.check_ghost(candidate)?;
        self.check_speed(candidate)
    }

    fn check_ghost(&self, candidate: &PlayRecord) -> Result<(), Rejection> {
        if candidate.status == PlayStatus::Quit && candidate.score == 0 {
            return Err(Rejection::GhostSession);
        }
        Ok(())
    }

    fn check_speed(&self, candidate: &PlayRecord) -> Result<(), Rejection> {
        if candidate.duration_seconds <= 1 {
            return Ok(());
        }
        match candidate.hits_per_second() {
            Some(hps) if hps > self.thresholds.max_hits_per_second => {
                Err(Rejection::ImpossibleSpeed {
                    hits_per_second: hps,
                })
            }
            _ => Ok(()),
        }
    }

    pub fn check_duplicate(
        &self,
        candidate: &PlayRecord,
        recent: &[PlayRecord],
    ) -> Result<(), Rejection> {
        let window = self.thresholds.duplicate_window;
        let tail = &recent[recent.len().saturating_sub(window)..];

        let tolerance = self.thresholds.duplicate_duration_tolerance_secs;
        match tail.iter().find(|p| {
            p.map_id == candidate.map_id
                && p.score == candidate.score
                && p.mods == candidate.mods
                && p.duration_seconds.abs_diff(candidate.duration_seconds) < tolerance
        }) {
            Some(existing) => Err(Rejection::Duplicate {
                existing_id: existing.id.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Mods;
    use chrono::Utc;

    fn record(id: &str, status: PlayStatus, score: i64, duration: u64, hits: u32) -> PlayRecord {
        let now = Utc::now();
        PlayRecord {
            id: id.to_string(),
            map_id: 7,
            map_set_id: 1,
            map_artist: "Camellia".to_string(),
            map_title: "Exit This Earth's Atomosphere".to_string(),
            map_diff: "Evolution".to_string(),
            mapper: "Mir".to_string(),
            ar: 9.5,
            cs: 4.0,
            od: 9.0,
            mods: Mods::new("HD"),
            status,
            score,
            accuracy: 96.0,
            max_combo: 100,
            misses: 0,
            n50: 0,
            n100: 0,
            n300: hits,
            slider_breaks: 0,
            pp: 200,
            rank: "S".to_string(),
            unstable_rate: 90,
            duration_seconds: duration,
            start_time: now,
            end_time: now,
        }
    }

    #[test]
    fn test_ghost_quit_rejected() {
        let filter = NoiseFilter::default();
        let candidate = record("a", PlayStatus::Quit, 0, 3, 0);
        assert_eq!(filter.check(&candidate, &[]), Err(Rejection::GhostSession));
    }

    #[test]
    fn test_zero_score_fail_is_kept() {
        let filter = NoiseFilter::default();
        let candidate = record("a", PlayStatus::Fail, 0, 3, 10);
        assert!(filter.check(&candidate, &[]).is_ok());
    }

    #[test]
    fn test_impossible_speed_rejected() {
        let filter = NoiseFilter::default();
        let candidate = record("a", PlayStatus::Pass, 100_000, 5, 200);
        match filter.check(&candidate, &[]) {
            Err(Rejection::ImpossibleSpeed { hits_per_second }) => {
                assert!((hits_per_second - 40.0).abs() < f64::EPSILON)
            }
            other => panic!("expected speed rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_speed_ignored_for_one_second_plays() {
        let filter = NoiseFilter::default();
        let candidate = record("a", PlayStatus::Pass, 100_000, 1, 200);
        assert!(filter.check(&candidate, &[]).is_ok());
    }

    #[test]
    fn test_duplicate_within_tolerance_rejected() {
        let filter = NoiseFilter::default();
        let existing = record("first", PlayStatus::Pass, 500_000, 30, 300);
        let candidate = record("second", PlayStatus::Pass, 500_000, 31, 300);
        assert_eq!(
            filter.check(&candidate, &[existing]),
            Err(Rejection::Duplicate {
                existing_id: "first".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_needs_matching_mods_and_duration() {
        let filter = NoiseFilter::default();
        let existing = record("first", PlayStatus::Pass, 500_000, 30, 300);

        let mut other_mods = record("second", PlayStatus::Pass, 500_000, 30, 300);
        other_mods.mods = Mods::new("HDDT");
        assert!(filter.check(&other_mods, &[existing.clone()]).is_ok());

        let later = record("third", PlayStatus::Pass, 500_000, 32, 300);
        assert!(filter.check(&later, &[existing]).is_ok());
    }

    #[test]
    fn test_duplicate_outside_window_is_kept() {
        let filter = NoiseFilter::default();
        let mut history = vec![record("old", PlayStatus::Pass, 500_000, 30, 300)];
        for i in 0..5 {
            history.push(record(&format!("other-{i}"), PlayStatus::Pass, 1_000 + i, 60, 300));
        }
        let candidate = record("new", PlayStatus::Pass, 500_000, 30, 300);
        assert!(filter.check(&candidate, &history).is_ok());
    }
}
