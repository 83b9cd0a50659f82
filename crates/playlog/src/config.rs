//! Tracker configuration file support.
//!
//! Loads `playlog.toml` from `--config` or the user config directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use playlog_core::{FilterThresholds, SessionThresholds};
use serde::Deserialize;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "playlog.toml";

/// Where the memory reader serves snapshots by default.
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:24050/ws";

const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_READER_STARTUP_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// WebSocket URL of the snapshot endpoint
    pub endpoint: Option<String>,
    /// Play store file (default: `<data_dir>/playlog/plays.json`)
    pub store_path: Option<PathBuf>,
    /// Mirror tracker events as JSON lines to this file
    pub log_file: Option<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub reconnect_delay: Option<Duration>,
    pub session: SessionThresholds,
    pub filter: FilterThresholds,
    /// External process that produces the snapshot stream
    pub reader: Option<ReaderConfig>,
}

/// The snapshot producer to launch alongside the tracker.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReaderConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    /// How long to give the reader before the first connection attempt
    #[serde(default = "default_startup_delay", with = "humantime_serde")]
    pub startup_delay: Duration,
}

fn default_startup_delay() -> Duration {
    DEFAULT_READER_STARTUP_DELAY
}

impl TrackerConfig {
    /// `<config_dir>/playlog/playlog.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("playlog").join(CONFIG_FILE_NAME))
    }

    /// Load from an explicit path or the default location.
    ///
    /// An explicit path must exist. A missing default file yields defaults;
    /// a file that exists but fails to parse is always a hard error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path)?
                .with_context(|| format!("Config file not found: {}", path.display())),
            None => match Self::default_path() {
                Some(path) => Ok(Self::load_from(&path)?.unwrap_or_default()),
                None => Ok(Self::default()),
            },
        }
    }

    /// Returns `Ok(None)` if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: TrackerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(Some(config))
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay.unwrap_or(DEFAULT_RECONNECT_DELAY)
    }
}
