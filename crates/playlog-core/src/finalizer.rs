use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::record::{PlayRecord, PlayStatus};
use crate::session::Session;
use crate::snapshot::Gameplay;

/// Build the committed record for a closed session.
///
/// Passes take their numbers from the results-screen snapshot (`terminal`),
/// which carries the authoritative final values. Fails and quits have no such
/// snapshot, so the session's live statistics are used instead; a pass
/// without one falls back the same way.
pub fn finalize(
    session: Session,
    status: PlayStatus,
    terminal: Option<&Gameplay>,
    ended_at: DateTime<Utc>,
) -> PlayRecord {
    let stats = &session.stats;

    let (pp, accuracy, score, hits, unstable_rate, rank) = match (status, terminal) {
        (PlayStatus::Pass, Some(g)) => (
            g.pp,
            g.accuracy,
            g.score,
            g.hits,
            g.unstable_rate,
            g.grade.clone().unwrap_or_else(|| "?".to_string()),
        ),
        _ => {
            let rank = match status {
                PlayStatus::Pass => stats.grade.clone().unwrap_or_else(|| "?".to_string()),
                PlayStatus::Fail => "F".to_string(),
                PlayStatus::Quit => "-".to_string(),
            };
            (
                stats.pp,
                stats.accuracy,
                stats.score,
                stats.hits,
                stats.unstable_rate,
                rank,
            )
        }
    };

    let mut duration_seconds = stats.time_ms.div_euclid(1000);
    if duration_seconds <= 0 {
        duration_seconds = (ended_at - session.started_at).num_seconds();
    }

    PlayRecord {
        id: Uuid::new_v4().to_string(),
        map_id: session.beatmap.id,
        map_set_id: session.beatmap.set_id,
        map_artist: session.beatmap.artist,
        map_title: session.beatmap.title,
        map_diff: session.beatmap.difficulty,
        mapper: session.beatmap.mapper,
        ar: session.beatmap.ar,
        cs: session.beatmap.cs,
        od: session.beatmap.od,
        mods: session.mods,
        status,
        score: score.max(0),
        accuracy: finite_or_zero(accuracy),
        max_combo: stats.max_combo,
        misses: hits.miss,
        n50: hits.n50,
        n100: hits.n100,
        n300: hits.n300,
        slider_breaks: stats.slider_breaks,
        pp: finite_or_zero(pp).round() as i64,
        rank,
        unstable_rate: unstable_rate.map(finite_or_zero).unwrap_or(0.0).round() as i64,
        duration_seconds: duration_seconds.max(0) as u64,
        start_time: session.started_at,
        end_time: ended_at,
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Beatmap, HitCounts, Mods};
    use crate::stats::LiveStats;
    use crate::session::SessionMode;
    use chrono::{Duration, TimeZone};

    fn session_with(stats: LiveStats) -> Session {
        Session {
            started_at: Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap(),
            beatmap: Beatmap {
                id: 42,
                title: "Blue Zenith".to_string(),
                ..Default::default()
            },
            mods: Mods::new("HR"),
            mode: SessionMode::Normal { failed: false },
            stats,
        }
    }

    fn live(time_ms: i64) -> LiveStats {
        LiveStats {
            pp: 101.6,
            accuracy: 95.0,
            score: 5000,
            hits: HitCounts {
                miss: 2,
                n50: 1,
                n100: 3,
                n300: 90,
            },
            grade: Some("A".to_string()),
            unstable_rate: Some(120.4),
            time_ms,
            max_combo: 77,
            slider_breaks: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_pass_uses_terminal_snapshot() {
        let session = session_with(live(30_500));
        let end = session.started_at + Duration::seconds(40);
        let terminal = Gameplay {
            score: 9000,
            accuracy: 97.2,
            pp: 150.5,
            hits: HitCounts {
                miss: 0,
                n50: 0,
                n100: 4,
                n300: 120,
            },
            grade: Some("S".to_string()),
            unstable_rate: Some(79.5),
            ..Default::default()
        };

        let record = finalize(session, PlayStatus::Pass, Some(&terminal), end);

        assert_eq!(record.score, 9000);
        assert_eq!(record.rank, "S");
        assert_eq!(record.pp, 151);
        assert_eq!(record.unstable_rate, 80);
        assert_eq!(record.max_combo, 77);
        assert_eq!(record.slider_breaks, 1);
        assert_eq!(record.duration_seconds, 30);
        assert_eq!(record.map_id, 42);
        assert_eq!(record.mods.as_str(), "HR");
    }

    #[test]
    fn test_fail_and_quit_use_live_stats() {
        let session = session_with(live(12_000));
        let end = session.started_at + Duration::seconds(15);
        let failed = finalize(session.clone(), PlayStatus::Fail, None, end);
        assert_eq!(failed.rank, "F");
        assert_eq!(failed.score, 5000);
        assert_eq!(failed.misses, 2);
        assert_eq!(failed.pp, 102);

        let quit = finalize(session, PlayStatus::Quit, None, end);
        assert_eq!(quit.rank, "-");
        assert_eq!(quit.duration_seconds, 12);
    }

    #[test]
    fn test_pass_without_terminal_uses_live_grade() {
        let session = session_with(live(20_000));
        let end = session.started_at + Duration::seconds(21);
        let record = finalize(session, PlayStatus::Pass, None, end);
        assert_eq!(record.rank, "A");
        assert_eq!(record.score, 5000);
        assert_eq!(record.n300, 90);
    }

    #[test]
    fn test_duration_falls_back_to_wall_clock() {
        let session = session_with(live(0));
        let end = session.started_at + Duration::milliseconds(7_900);
        let record = finalize(session, PlayStatus::Quit, None, end);
        assert_eq!(record.duration_seconds, 7);
        assert_eq!(record.end_time, end);
    }

    #[test]
    fn test_missing_values_default_to_zero() {
        let session = session_with(LiveStats::default());
        let end = session.started_at;
        let record = finalize(session, PlayStatus::Quit, None, end);
        assert_eq!(record.score, 0);
        assert_eq!(record.unstable_rate, 0);
        assert_eq!(record.pp, 0);
        assert_eq!(record.duration_seconds, 0);
    }
}
