use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

/// Game phase reported by the snapshot producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    MainMenu,
    Editor,
    Playing,
    SongSelect,
    Results,
    MultiplayerLobby,
    MultiplayerRoom,
    Other(i32),
}

impl From<i32> for MenuState {
    fn from(value: i32) -> Self {
        match value {
            0 => MenuState::MainMenu,
            1 => MenuState::Editor,
            2 => MenuState::Playing,
            5 => MenuState::SongSelect,
            7 => MenuState::Results,
            11 => MenuState::MultiplayerLobby,
            12 => MenuState::MultiplayerRoom,
            other => MenuState::Other(other),
        }
    }
}

impl MenuState {
    pub fn is_playing(self) -> bool {
        self == MenuState::Playing
    }

    pub fn is_results(self) -> bool {
        self == MenuState::Results
    }

    /// Phases that end a play without a results screen (quit or fail).
    pub fn leaves_play(self) -> bool {
        matches!(
            self,
            MenuState::MainMenu
                | MenuState::Editor
                | MenuState::SongSelect
                | MenuState::MultiplayerLobby
                | MenuState::MultiplayerRoom
        )
    }
}

/// Upper-cased modifier string such as `HDDT`, tested as two-letter tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mods(String);

impl Mods {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0
            .as_bytes()
            .chunks(2)
            .any(|chunk| chunk.eq_ignore_ascii_case(token.as_bytes()))
    }
}

impl std::fmt::Display for Mods {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            write!(f, "NM")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Beatmap {
    pub id: i64,
    pub set_id: i64,
    pub artist: String,
    pub title: String,
    pub difficulty: String,
    pub mapper: String,
    pub ar: f64,
    pub cs: f64,
    pub od: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitCounts {
    pub miss: u32,
    pub n50: u32,
    pub n100: u32,
    pub n300: u32,
}

impl HitCounts {
    /// Every judged object, misses included.
    pub fn judged(&self) -> u64 {
        [self.miss, self.n50, self.n100, self.n300]
            .iter()
            .map(|&n| u64::from(n))
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gameplay {
    pub score: i64,
    pub accuracy: f64,
    pub combo: u32,
    pub hits: HitCounts,
    pub grade: Option<String>,
    pub unstable_rate: Option<f64>,
    pub pp: f64,
    pub hp: Option<f64>,
    /// Elapsed map time in milliseconds.
    pub time_ms: i64,
    pub player_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsScreen {
    pub play_time: Option<DateTime<Utc>>,
}

/// One point-in-time observation of the running game.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub menu_state: MenuState,
    pub beatmap: Beatmap,
    pub mods: Mods,
    pub gameplay: Gameplay,
    pub results: Option<ResultsScreen>,
    pub profile_name: Option<String>,
}

impl Snapshot {
    /// Parse one JSON document from the snapshot endpoint.
    pub fn from_json(payload: &str) -> Result<Self, SnapshotError> {
        let doc: wire::Document = serde_json::from_str(payload)?;
        Self::from_wire(doc)
    }

    /// True when the gameplay name disagrees with the logged-in profile,
    /// which is how replays and spectating show up.
    pub fn is_foreign_player(&self) -> bool {
        match (self.gameplay.player_name.as_deref(), self.profile_name.as_deref()) {
            (Some(player), Some(profile)) if !player.is_empty() && !profile.is_empty() => {
                player != profile
            }
            _ => false,
        }
    }

    pub fn result_time(&self) -> Option<DateTime<Utc>> {
        self.results.as_ref().and_then(|r| r.play_time)
    }

    fn from_wire(doc: wire::Document) -> Result<Self, SnapshotError> {
        let menu = doc.menu.ok_or(SnapshotError::Incomplete("menu"))?;
        let bm = menu.bm.ok_or(SnapshotError::Incomplete("menu.bm"))?;
        let gameplay = doc.gameplay.ok_or(SnapshotError::Incomplete("gameplay"))?;

        let beatmap = Beatmap {
            id: bm.id,
            set_id: bm.set,
            artist: bm.metadata.artist,
            title: bm.metadata.title,
            difficulty: bm.metadata.difficulty,
            mapper: bm.metadata.mapper,
            ar: bm.stats.ar,
            cs: bm.stats.cs,
            od: bm.stats.od,
        };

        let gameplay = Gameplay {
            score: gameplay.score,
            accuracy: gameplay.accuracy,
            combo: gameplay.combo.current,
            hits: HitCounts {
                miss: gameplay.hits.miss,
                n50: gameplay.hits.n50,
                n100: gameplay.hits.n100,
                n300: gameplay.hits.n300,
            },
            grade: gameplay
                .hits
                .grade
                .and_then(|g| g.current)
                .filter(|g| !g.is_empty()),
            unstable_rate: gameplay.hits.unstable_rate,
            pp: gameplay.pp.current,
            hp: gameplay.hp.normal,
            time_ms: bm.time.current as i64,
            player_name: gameplay.name,
        };

        let results = doc.results_screen.map(|r| ResultsScreen {
            play_time: r
                .play_time
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc)),
        });

        Ok(Snapshot {
            menu_state: MenuState::from(menu.state),
            beatmap,
            mods: Mods::new(menu.mods.str.as_deref().unwrap_or_default()),
            gameplay,
            results,
            profile_name: doc.user_profile.and_then(|p| p.name),
        })
    }
}

/// JSON layout emitted by gosumemory/tosu style memory readers.
///
/// Readers report `null` for values they cannot read yet, so every scalar
/// and nested section goes through `or_default`.
mod wire {
    use serde::{Deserialize, Deserializer};

    fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Document {
        pub menu: Option<Menu>,
        pub gameplay: Option<Gameplay>,
        pub results_screen: Option<ResultsScreen>,
        pub user_profile: Option<UserProfile>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Menu {
        #[serde(default, deserialize_with = "or_default")]
        pub state: i32,
        pub bm: Option<Beatmap>,
        #[serde(default, deserialize_with = "or_default")]
        pub mods: Mods,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct Mods {
        pub str: Option<String>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct Beatmap {
        #[serde(deserialize_with = "or_default")]
        pub id: i64,
        #[serde(deserialize_with = "or_default")]
        pub set: i64,
        #[serde(deserialize_with = "or_default")]
        pub metadata: Metadata,
        #[serde(deserialize_with = "or_default")]
        pub stats: Stats,
        #[serde(deserialize_with = "or_default")]
        pub time: Time,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct Metadata {
        #[serde(deserialize_with = "or_default")]
        pub artist: String,
        #[serde(deserialize_with = "or_default")]
        pub title: String,
        #[serde(deserialize_with = "or_default")]
        pub difficulty: String,
        #[serde(deserialize_with = "or_default")]
        pub mapper: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct Stats {
        #[serde(rename = "AR", deserialize_with = "or_default")]
        pub ar: f64,
        #[serde(rename = "CS", deserialize_with = "or_default")]
        pub cs: f64,
        #[serde(rename = "OD", deserialize_with = "or_default")]
        pub od: f64,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct Time {
        #[serde(deserialize_with = "or_default")]
        pub current: f64,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct Gameplay {
        pub name: Option<String>,
        #[serde(deserialize_with = "or_default")]
        pub score: i64,
        #[serde(deserialize_with = "or_default")]
        pub accuracy: f64,
        #[serde(deserialize_with = "or_default")]
        pub combo: Combo,
        #[serde(deserialize_with = "or_default")]
        pub hp: Hp,
        #[serde(deserialize_with = "or_default")]
        pub hits: Hits,
        #[serde(deserialize_with = "or_default")]
        pub pp: Pp,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct Combo {
        #[serde(deserialize_with = "or_default")]
        pub current: u32,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct Hp {
        pub normal: Option<f64>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct Pp {
        #[serde(deserialize_with = "or_default")]
        pub current: f64,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct Hits {
        #[serde(rename = "0", deserialize_with = "or_default")]
        pub miss: u32,
        #[serde(rename = "50", deserialize_with = "or_default")]
        pub n50: u32,
        #[serde(rename = "100", deserialize_with = "or_default")]
        pub n100: u32,
        #[serde(rename = "300", deserialize_with = "or_default")]
        pub n300: u32,
        #[serde(rename = "unstableRate")]
        pub unstable_rate: Option<f64>,
        pub grade: Option<Grade>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct Grade {
        pub current: Option<String>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct ResultsScreen {
        pub play_time: Option<String>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct UserProfile {
        pub name: Option<String>,
    }
}
