use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use colored::Colorize;

use playlog_core::{PlayRecord, PlayStatus, PlayStore};
use playlog_store::{JsonPlayStore, PlayFilter};

#[derive(Subcommand, Debug)]
pub enum PlaysAction {
    /// List recorded plays, newest first
    List {
        /// Filter by outcome
        #[arg(long, value_enum)]
        status: Option<StatusChoice>,

        /// Search map title and artist
        #[arg(long)]
        search: Option<String>,

        /// Show plays after this date (YYYY-MM-DD)
        #[arg(long)]
        after: Option<String>,

        /// Show plays before this date (YYYY-MM-DD)
        #[arg(long)]
        before: Option<String>,

        /// Show at most this many plays
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show detailed play info
    Show {
        /// Play ID (launches interactive picker if omitted)
        id: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a play from the store
    Remove {
        /// Play ID (launches interactive picker if omitted)
        id: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusChoice {
    Pass,
    Fail,
    Quit,
}

impl From<StatusChoice> for PlayStatus {
    fn from(choice: StatusChoice) -> Self {
        match choice {
            StatusChoice::Pass => PlayStatus::Pass,
            StatusChoice::Fail => PlayStatus::Fail,
            StatusChoice::Quit => PlayStatus::Quit,
        }
    }
}

pub fn handle_plays_command(action: PlaysAction, store_path: Option<PathBuf>) -> Result<()> {
    let store = match store_path {
        Some(path) => JsonPlayStore::with_path(path),
        None => JsonPlayStore::new()?,
    };

    match action {
        PlaysAction::List {
            status,
            search,
            after,
            before,
            limit,
            json,
        } => {
            let filter = build_filter(status, search, after, before)?;
            let mut plays = store.list_filtered(&filter)?;
            if let Some(limit) = limit {
                plays.truncate(limit);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&plays)?);
            } else if plays.is_empty() {
                println!("{}", "No plays found.".dimmed());
            } else {
                print_plays_table(&plays);
            }
        }
        PlaysAction::Show { id, json } => {
            let id = resolve_play_id(&store, id)?;
            let play = find_play(&store, &id)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&play)?);
            } else {
                print_play_detail(&play);
            }
        }
        PlaysAction::Remove { id, yes } => {
            let id = resolve_play_id(&store, id)?;
            let play = find_play(&store, &id)?;

            println!("{}", play_line(&play));
            if !yes {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt("Delete this play?")
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("{}", "Cancelled.".dimmed());
                    return Ok(());
                }
            }

            if store.remove(&id)? {
                println!("{} Deleted play {}", "✓".bright_green(), id);
            } else {
                anyhow::bail!("Play {} was already removed", id);
            }
        }
    }

    Ok(())
}

fn build_filter(
    status: Option<StatusChoice>,
    search: Option<String>,
    after: Option<String>,
    before: Option<String>,
) -> Result<PlayFilter> {
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

    let after = after
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
                .map_err(|e| anyhow::anyhow!("Invalid --after date: {}", e))
        })
        .transpose()?;

    let before = before
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map(|d| {
                    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
                    Utc.from_utc_datetime(&d.and_time(end_of_day))
                })
                .map_err(|e| anyhow::anyhow!("Invalid --before date: {}", e))
        })
        .transpose()?;

    Ok(PlayFilter {
        status: status.map(PlayStatus::from),
        after,
        before,
        search,
    })
}

fn find_play(store: &JsonPlayStore, id: &str) -> Result<PlayRecord> {
    store
        .get(id)?
        .with_context(|| format!("No play with id {}", id))
}

fn resolve_play_id(store: &JsonPlayStore, id: Option<String>) -> Result<String> {
    if let Some(id) = id {
        return Ok(id);
    }

    // Interactive picker
    let plays = store.list_filtered(&PlayFilter::default())?;
    if plays.is_empty() {
        anyhow::bail!("No plays found.");
    }

    let items: Vec<String> = plays.iter().map(play_line).collect();

    let selection = dialoguer::FuzzySelect::new()
        .with_prompt("Select a play")
        .items(&items)
        .default(0)
        .interact()?;

    Ok(plays[selection].id.clone())
}

/// One-line summary used by the picker and the removal prompt.
fn play_line(play: &PlayRecord) -> String {
    format!(
        "{} | {:4} {:2} | {} - {} [{}] +{} | {:.2}% {}pp",
        play.start_time.format("%Y-%m-%d %H:%M"),
        play.status.to_string(),
        play.rank,
        play.map_artist,
        truncate(&play.map_title, 40),
        play.map_diff,
        play.mods,
        play.accuracy,
        play.pp
    )
}

fn status_colored(status: PlayStatus) -> String {
    let text = status.to_string();
    match status {
        PlayStatus::Pass => text.bright_green().to_string(),
        PlayStatus::Fail => text.bright_red().to_string(),
        PlayStatus::Quit => text.bright_yellow().to_string(),
    }
}

fn print_plays_table(plays: &[PlayRecord]) {
    println!(
        "{:<17} {:<6} {:<4} {:<8} {:>7} {:>6} {:>5} {:<8} {}",
        "DATE".dimmed(),
        "STATUS".dimmed(),
        "RANK".dimmed(),
        "MODS".dimmed(),
        "ACC".dimmed(),
        "COMBO".dimmed(),
        "PP".dimmed(),
        "LENGTH".dimmed(),
        "MAP".dimmed(),
    );

    for p in plays {
        let date = p.start_time.format("%Y-%m-%d %H:%M").to_string();
        // Pad before colouring so escape codes don't break alignment.
        let status = format!("{:<6}", p.status.to_string());
        let status = match p.status {
            PlayStatus::Pass => status.bright_green().to_string(),
            PlayStatus::Fail => status.bright_red().to_string(),
            PlayStatus::Quit => status.bright_yellow().to_string(),
        };
        let map = format!(
            "{} - {} [{}]",
            p.map_artist,
            truncate(&p.map_title, 40),
            p.map_diff
        );

        println!(
            "{:<17} {} {:<4} {:<8} {:>6.2}% {:>5}x {:>5} {:<8} {}",
            date,
            status,
            p.rank,
            p.mods.to_string(),
            p.accuracy,
            p.max_combo,
            p.pp,
            format_duration(p.duration_seconds),
            map
        );
    }
}

fn print_play_detail(play: &PlayRecord) {
    println!("{}", "=== Play Detail ===".bright_blue().bold());
    println!("{}  {}", "ID:".dimmed(), play.id);
    println!(
        "{}  {} - {} [{}]",
        "Map:".dimmed(),
        play.map_artist,
        play.map_title.bold(),
        play.map_diff
    );
    println!("{}  {}", "Mapper:".dimmed(), play.mapper);
    println!(
        "{}  {} (set {})",
        "Beatmap ID:".dimmed(),
        play.map_id,
        play.map_set_id
    );
    println!(
        "{}  AR {:.1}  CS {:.1}  OD {:.1}",
        "Difficulty:".dimmed(),
        play.ar,
        play.cs,
        play.od
    );
    println!("{}  {}", "Mods:".dimmed(), play.mods);
    println!();
    println!("{}  {}", "Status:".dimmed(), status_colored(play.status));
    println!("{}  {}", "Rank:".dimmed(), play.rank.bold());
    println!("{}  {}", "Score:".dimmed(), play.score);
    println!("{}  {:.2}%", "Accuracy:".dimmed(), play.accuracy);
    println!("{}  {}pp", "Performance:".dimmed(), play.pp);
    println!(
        "{}  {}x ({} slider {})",
        "Max Combo:".dimmed(),
        play.max_combo,
        play.slider_breaks,
        if play.slider_breaks == 1 { "break" } else { "breaks" }
    );
    println!(
        "{}  {} / {} / {} / {}",
        "300/100/50/Miss:".dimmed(),
        play.n300,
        play.n100,
        play.n50,
        play.misses.to_string().bright_red()
    );
    println!("{}  {}", "Unstable Rate:".dimmed(), play.unstable_rate);
    println!();
    println!(
        "{}  {}",
        "Started:".dimmed(),
        play.start_time.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "{}  {}",
        "Ended:".dimmed(),
        play.end_time.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "{}  {}",
        "Duration:".dimmed(),
        format_duration(play.duration_seconds)
    );
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_build_filter_dates() {
        let filter = build_filter(
            Some(StatusChoice::Fail),
            None,
            Some("2026-01-20".to_string()),
            Some("2026-01-22".to_string()),
        )
        .unwrap();

        assert_eq!(filter.status, Some(PlayStatus::Fail));
        assert_eq!(
            filter.after,
            Some(Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap())
        );
        assert_eq!(
            filter.before,
            Some(Utc.with_ymd_and_hms(2026, 1, 22, 23, 59, 59).unwrap())
        );
    }

    #[test]
    fn test_build_filter_rejects_bad_date() {
        let err = build_filter(None, None, Some("20/01/2026".to_string()), None).unwrap_err();
        assert!(err.to_string().contains("--after"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(185), "3m 5s");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 40), "short");
        assert_eq!(truncate("チルノのパーフェクトさんすう教室", 8), "チルノのパ...");
    }
}
