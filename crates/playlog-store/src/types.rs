use chrono::{DateTime, Utc};
use playlog_core::{PlayRecord, PlayStatus};

/// Filter parameters for listing plays.
#[derive(Debug, Default)]
pub struct PlayFilter {
    pub status: Option<PlayStatus>,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    /// Case-insensitive match against map title or artist.
    pub search: Option<String>,
}

impl PlayFilter {
    pub fn matches(&self, play: &PlayRecord) -> bool {
        if let Some(status) = self.status {
            if play.status != status {
                return false;
            }
        }

        if let Some(after) = self.after {
            if play.start_time < after {
                return false;
            }
        }

        if let Some(before) = self.before {
            if play.start_time > before {
                return false;
            }
        }

        if let Some(ref search) = self.search {
            let search_lower = search.to_lowercase();
            if !play.map_title.to_lowercase().contains(&search_lower)
                && !play.map_artist.to_lowercase().contains(&search_lower)
            {
                return false;
            }
        }

        true
    }
}
