use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Structured log events for the tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    TrackerStarted {
        endpoint: String,
        store_path: PathBuf,
    },
    Connected {
        endpoint: String,
    },
    Waiting {
        endpoint: String,
        retry_secs: f64,
    },
    PlaySaved {
        id: String,
        artist: String,
        title: String,
        difficulty: String,
        mods: String,
        status: String,
        rank: String,
        score: i64,
        accuracy: f64,
        pp: i64,
        max_combo: u32,
        misses: u32,
        duration_secs: u64,
    },
    PersistenceFailed {
        error: String,
    },
    ReaderStarted {
        path: PathBuf,
        pid: Option<u32>,
    },
    ReaderExited {
        code: Option<i32>,
    },
    TrackerStopped {
        plays_saved: usize,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for tracker events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON lines
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::TrackerStarted {
                endpoint,
                store_path,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "playlog".bold().bright_white(),
                    " ".repeat(60) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Endpoint:".dimmed(),
                    Self::truncate_with_padding(endpoint, 55, 58).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Store:".dimmed(),
                    Self::truncate_with_padding(&store_path.display().to_string(), 58, 61)
                        .dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::Connected { endpoint } => {
                let _ = writeln!(
                    stderr,
                    "  {} Connected to {}",
                    "●".bright_green(),
                    endpoint.bright_white()
                );
            }
            LogEvent::Waiting {
                endpoint,
                retry_secs,
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} Waiting for {} (retrying every {:.0}s)",
                    "○".bright_yellow(),
                    endpoint,
                    retry_secs
                );
            }
            LogEvent::PlaySaved {
                artist,
                title,
                difficulty,
                mods,
                status,
                rank,
                score,
                accuracy,
                pp,
                max_combo,
                misses,
                duration_secs,
                ..
            } => {
                let status_styled = match status.as_str() {
                    "Pass" => status.bright_green().bold(),
                    "Fail" => status.bright_red().bold(),
                    _ => status.bright_yellow().bold(),
                };
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "  {} {} {} - {} [{}] {}",
                    "▶".bright_cyan(),
                    status_styled,
                    artist,
                    title.bold(),
                    difficulty,
                    format!("+{}", mods).bright_magenta()
                );
                let _ = writeln!(
                    stderr,
                    "    {} {}  {:.2}%  {}x  {} miss  {}pp  {}",
                    rank.bold(),
                    score,
                    accuracy,
                    max_combo,
                    misses,
                    pp,
                    format!("({}s)", duration_secs).dimmed()
                );
            }
            LogEvent::PersistenceFailed { error } => {
                let _ = writeln!(
                    stderr,
                    "{} Failed to save play: {}",
                    "✗".bright_red(),
                    error.bright_red()
                );
            }
            LogEvent::ReaderStarted { path, pid } => {
                let pid = pid.map(|p| format!(" (pid {})", p)).unwrap_or_default();
                let _ = writeln!(
                    stderr,
                    "  {} Started reader {}{}",
                    "▶".dimmed(),
                    path.display(),
                    pid
                );
            }
            LogEvent::ReaderExited { code } => {
                let code = code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                let _ = writeln!(
                    stderr,
                    "  {} Reader exited ({})",
                    "⚠".bright_yellow(),
                    code
                );
            }
            LogEvent::TrackerStopped { plays_saved } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Stopped. {} {} saved this session.",
                    "■".bright_blue(),
                    plays_saved,
                    if *plays_saved == 1 { "play" } else { "plays" }
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::TrackerStarted { endpoint, .. } => {
                format!("[{}] tracker:start {}", timestamp, endpoint)
            }
            LogEvent::Connected { .. } => format!("[{}] stream:connected", timestamp),
            LogEvent::Waiting { retry_secs, .. } => {
                format!("[{}] stream:waiting {:.0}s", timestamp, retry_secs)
            }
            LogEvent::PlaySaved {
                title,
                mods,
                status,
                rank,
                score,
                accuracy,
                ..
            } => format!(
                "[{}] play:{} {} +{} {} {} {:.2}%",
                timestamp,
                status.to_lowercase(),
                title,
                mods,
                rank,
                score,
                accuracy
            ),
            LogEvent::PersistenceFailed { error } => {
                format!("[{}] error:store:{}", timestamp, error)
            }
            LogEvent::ReaderStarted { pid, .. } => format!(
                "[{}] reader:start{}",
                timestamp,
                pid.map(|p| format!(":{}", p)).unwrap_or_default()
            ),
            LogEvent::ReaderExited { code } => format!(
                "[{}] reader:exit{}",
                timestamp,
                code.map(|c| format!(":{}", c)).unwrap_or_default()
            ),
            LogEvent::TrackerStopped { plays_saved } => {
                format!("[{}] tracker:stop:{}", timestamp, plays_saved)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let len = s.chars().count();
        let truncated = if len > max_len {
            let head: String = s.chars().take(max_len - 3).collect();
            format!("{}...", head)
        } else {
            s.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1);
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("Compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = LogEvent::Waiting {
            endpoint: "ws://127.0.0.1:24050/ws".to_string(),
            retry_secs: 5.0,
        };
        let value = event.with_timestamp();
        assert_eq!(value["event"], "waiting");
        assert_eq!(value["retry_secs"], 5.0);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_truncate_handles_multibyte_titles() {
        let padded = Logger::truncate_with_padding("ヒトリゴトヒトリゴトヒトリゴト", 8, 12);
        assert!(padded.starts_with("ヒトリゴト..."));
        assert_eq!(padded.chars().count(), 12);
    }

    #[test]
    fn test_file_output_is_json_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("playlog.jsonl");
        let logger = Logger::with_file(LogFormat::Compact, &path).unwrap();

        logger.log(&LogEvent::PersistenceFailed {
            error: "disk full".to_string(),
        });
        logger.log(&LogEvent::TrackerStopped { plays_saved: 3 });

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "persistence_failed");
        assert_eq!(lines[1]["plays_saved"], 3);
    }
}
