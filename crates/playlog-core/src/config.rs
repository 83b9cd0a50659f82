//! Heuristic thresholds for session reconstruction and noise rejection.
//!
//! The defaults are empirical values. They are exposed so they can be tuned
//! from the `[session]` and `[filter]` sections of `playlog.toml`.

use std::time::Duration;

use serde::Deserialize;

/// Thresholds used by [`crate::SessionEngine`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionThresholds {
    /// Elapsed time a session must have passed before a restart counts as a retry.
    pub retry_progress_ms: i64,
    /// Elapsed time below which a snapshot looks like a freshly restarted map.
    pub retry_restart_ms: i64,
    /// Combo that must have been held before a combo drop counts as a slider break.
    pub slider_break_combo_floor: u32,
    /// How far before session start a results timestamp may lie.
    #[serde(with = "humantime_serde")]
    pub stale_results_tolerance: Duration,
}

impl Default for SessionThresholds {
    fn default() -> Self {
        Self {
            retry_progress_ms: 2000,
            retry_restart_ms: 1000,
            slider_break_combo_floor: 5,
            stale_results_tolerance: Duration::from_secs(60),
        }
    }
}

/// Thresholds used by [`crate::NoiseFilter`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterThresholds {
    pub max_hits_per_second: f64,
    /// Number of most recent records consulted for duplicate detection.
    pub duplicate_window: usize,
    pub duplicate_duration_tolerance_secs: u64,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self {
            max_hits_per_second: 18.0,
            duplicate_window: 5,
            duplicate_duration_tolerance_secs: 2,
        }
    }
}
