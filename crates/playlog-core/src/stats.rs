use crate::snapshot::{Gameplay, HitCounts};

/// Running statistics for the open session, rebuilt from every in-play snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveStats {
    pub pp: f64,
    pub accuracy: f64,
    pub score: i64,
    pub hits: HitCounts,
    pub grade: Option<String>,
    pub unstable_rate: Option<f64>,
    /// Last elapsed map time seen, in milliseconds.
    pub time_ms: i64,
    pub max_combo: u32,
    pub slider_breaks: u32,
    pub(crate) prev_combo: u32,
}

impl LiveStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one in-play observation into the running totals.
    ///
    /// A slider break is a combo drop from above `combo_floor` that is not
    /// accompanied by a new miss.
    pub fn observe(&mut self, gameplay: &Gameplay, combo_floor: u32) {
        let combo = gameplay.combo;

        self.max_combo = self.max_combo.max(combo);

        if combo < self.prev_combo
            && self.prev_combo > combo_floor
            && gameplay.hits.miss == self.hits.miss
        {
            self.slider_breaks += 1;
        }
        self.prev_combo = combo;

        self.pp = gameplay.pp;
        self.accuracy = gameplay.accuracy;
        self.score = gameplay.score;
        self.hits = gameplay.hits;
        self.unstable_rate = gameplay.unstable_rate;
        self.time_ms = gameplay.time_ms;
        if gameplay.grade.is_some() {
            self.grade = gameplay.grade.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(combo: u32, miss: u32, time_ms: i64) -> Gameplay {
        Gameplay {
            score: 1000 * combo as i64,
            combo,
            hits: HitCounts {
                miss,
                n300: combo + miss,
                ..Default::default()
            },
            time_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_max_combo_survives_drops() {
        let mut stats = LiveStats::new();
        for (combo, t) in [(10, 100), (150, 200), (3, 300)] {
            stats.observe(&frame(combo, 0, t), 5);
        }
        assert_eq!(stats.max_combo, 150);
        assert_eq!(stats.time_ms, 300);
    }

    #[test]
    fn test_combo_drop_without_miss_is_slider_break() {
        let mut stats = LiveStats::new();
        stats.observe(&frame(40, 0, 100), 5);
        stats.observe(&frame(0, 0, 200), 5);
        assert_eq!(stats.slider_breaks, 1);
    }

    #[test]
    fn test_combo_drop_with_miss_is_not_slider_break() {
        let mut stats = LiveStats::new();
        stats.observe(&frame(40, 0, 100), 5);
        stats.observe(&frame(0, 1, 200), 5);
        assert_eq!(stats.slider_breaks, 0);
        assert_eq!(stats.hits.miss, 1);
    }

    #[test]
    fn test_small_combo_drop_is_noise() {
        let mut stats = LiveStats::new();
        stats.observe(&frame(5, 0, 100), 5);
        stats.observe(&frame(0, 0, 200), 5);
        assert_eq!(stats.slider_breaks, 0);
    }

    #[test]
    fn test_grade_keeps_last_reported_value() {
        let mut stats = LiveStats::new();
        let mut g = frame(10, 0, 100);
        g.grade = Some("SS".to_string());
        stats.observe(&g, 5);
        stats.observe(&frame(11, 0, 200), 5);
        assert_eq!(stats.grade.as_deref(), Some("SS"));
    }
}
