use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::Mods;

/// Terminal outcome of a play session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayStatus {
    Pass,
    Fail,
    Quit,
}

impl std::fmt::Display for PlayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayStatus::Pass => write!(f, "Pass"),
            PlayStatus::Fail => write!(f, "Fail"),
            PlayStatus::Quit => write!(f, "Quit"),
        }
    }
}

impl std::str::FromStr for PlayStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pass" => Ok(PlayStatus::Pass),
            "fail" => Ok(PlayStatus::Fail),
            "quit" => Ok(PlayStatus::Quit),
            _ => Err(format!("Unknown play status: {}", s)),
        }
    }
}

/// A committed play. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayRecord {
    pub id: String,
    pub map_id: i64,
    pub map_set_id: i64,
    pub map_artist: String,
    pub map_title: String,
    pub map_diff: String,
    pub mapper: String,
    pub ar: f64,
    pub cs: f64,
    pub od: f64,
    pub mods: Mods,
    pub status: PlayStatus,
    pub score: i64,
    pub accuracy: f64,
    pub max_combo: u32,
    pub misses: u32,
    pub n50: u32,
    pub n100: u32,
    pub n300: u32,
    #[serde(rename = "sb")]
    pub slider_breaks: u32,
    pub pp: i64,
    pub rank: String,
    #[serde(rename = "ur")]
    pub unstable_rate: i64,
    pub duration_seconds: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl PlayRecord {
    /// Summed as `u64`: readers can report garbage counts near `u32::MAX`.
    pub fn judged_hits(&self) -> u64 {
        [self.n300, self.n100, self.n50, self.misses]
            .iter()
            .map(|&n| u64::from(n))
            .sum()
    }

    /// Judged hits per second of play, or `None` for plays too short to rate.
    pub fn hits_per_second(&self) -> Option<f64> {
        if self.duration_seconds == 0 {
            return None;
        }
        Some(self.judged_hits() as f64 / self.duration_seconds as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(duration_seconds: u64) -> PlayRecord {
        let start = Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap();
        PlayRecord {
            id: "r1".to_string(),
            map_id: 1,
            map_set_id: 1,
            map_artist: "xi".to_string(),
            map_title: "Blue Zenith".to_string(),
            map_diff: "FOUR DIMENSIONS".to_string(),
            mapper: "Asphyxia".to_string(),
            ar: 9.8,
            cs: 4.0,
            od: 9.0,
            mods: Mods::default(),
            status: PlayStatus::Quit,
            score: 1000,
            accuracy: 90.0,
            max_combo: 10,
            misses: 1,
            n50: 0,
            n100: 0,
            n300: u32::MAX,
            slider_breaks: 0,
            pp: 0,
            rank: "-".to_string(),
            unstable_rate: 0,
            duration_seconds,
            start_time: start,
            end_time: start,
        }
    }

    #[test]
    fn test_judged_hits_do_not_overflow() {
        let play = record(10);
        assert_eq!(play.judged_hits(), u64::from(u32::MAX) + 1);
        let hps = play.hits_per_second().unwrap();
        assert!((hps - (u64::from(u32::MAX) + 1) as f64 / 10.0).abs() < 1.0);
    }

    #[test]
    fn test_zero_duration_has_no_rate() {
        assert!(record(0).hits_per_second().is_none());
    }
}
