use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{info, warn};

use playlog_core::{
    ConnectionStatus, NoiseFilter, PlayRecord, PlayStore, SessionEngine, Tracker, TrackerEvent,
};
use playlog_logging::{init_tracing, LogEvent, LogFormat, Logger};
use playlog_store::JsonPlayStore;
use playlog_stream::{ReconnectPolicy, SnapshotStream};

use crate::config::TrackerConfig;
use crate::reader::{shutdown_requested, ReaderProcess};

/// Capacity of the snapshot channel between the stream task and the tracker.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 256;

#[derive(Args, Debug)]
pub struct TrackArgs {
    /// Config file (default: <config_dir>/playlog/playlog.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Snapshot endpoint URL (overrides config)
    #[arg(long)]
    endpoint: Option<String>,

    /// Play store file (overrides config)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Diagnostic log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

pub async fn run(args: TrackArgs) -> Result<()> {
    let config = TrackerConfig::load(args.config.as_deref())?;

    let log_format: LogFormat = args.log_format.into();
    init_tracing(&args.log_level, log_format);

    let logger = match config.log_file {
        Some(ref path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };
    let logger = Arc::new(logger);

    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| config.endpoint().to_string());
    let reconnect_delay = config.reconnect_delay();

    let store = match args.store.clone().or_else(|| config.store_path.clone()) {
        Some(path) => JsonPlayStore::with_path(path),
        None => JsonPlayStore::new()?,
    };
    // Refuse to start on an unreadable store rather than fail on the first play.
    let existing = store
        .list()
        .with_context(|| format!("Failed to read play store {}", store.path().display()))?;
    info!(plays = existing.len(), path = %store.path().display(), "Opened play store");

    logger.log(&LogEvent::TrackerStarted {
        endpoint: endpoint.clone(),
        store_path: store.path().to_path_buf(),
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    {
        let shutdown_tx = Arc::clone(&shutdown_tx);
        ctrlc::set_handler(move || {
            eprintln!("\nStopping tracker...");
            let _ = shutdown_tx.send(true);
        })
        .context("Failed to set Ctrl+C handler")?;
    }

    let reader_task = match config.reader {
        Some(ref reader_config) => match ReaderProcess::spawn(reader_config)? {
            Some(reader) => {
                logger.log(&LogEvent::ReaderStarted {
                    path: reader.path().to_path_buf(),
                    pid: reader.id(),
                });

                let logger = Arc::clone(&logger);
                let shutdown = shutdown_rx.clone();
                let task = tokio::spawn(async move {
                    match reader.supervise(shutdown).await {
                        Ok(code) => logger.log(&LogEvent::ReaderExited { code }),
                        Err(e) => warn!(error = %e, "Snapshot reader supervision failed"),
                    }
                });

                let mut shutdown = shutdown_rx.clone();
                tokio::select! {
                    _ = tokio::time::sleep(reader_config.startup_delay) => {}
                    _ = shutdown_requested(&mut shutdown) => {}
                }
                Some(task)
            }
            None => None,
        },
        None => None,
    };

    let (tx, rx) = mpsc::channel(SNAPSHOT_CHANNEL_CAPACITY);
    let stream = SnapshotStream::new(endpoint.clone(), ReconnectPolicy::fixed(reconnect_delay));
    let stream_task = tokio::spawn(stream.run(tx, shutdown_rx.clone()));

    let store: Arc<dyn PlayStore> = Arc::new(store);
    let mut tracker = Tracker::new(
        SessionEngine::new(config.session.clone()),
        NoiseFilter::new(config.filter.clone()),
        store,
    );
    let events = tracker.subscribe();
    let reporter = tokio::spawn(report_events(
        events,
        Arc::clone(&logger),
        endpoint,
        reconnect_delay,
    ));

    tracker.run(rx, shutdown_rx).await;

    // The tracker can also stop because the stream ended; make sure every
    // task sees the shutdown.
    let _ = shutdown_tx.send(true);
    drop(tracker);

    match stream_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Snapshot stream stopped"),
        Err(e) => warn!(error = %e, "Snapshot stream task failed"),
    }
    if let Some(task) = reader_task {
        let _ = task.await;
    }
    let plays_saved = reporter.await.unwrap_or_default();

    logger.log(&LogEvent::TrackerStopped { plays_saved });
    Ok(())
}

/// Render tracker notifications through the logger until the tracker is
/// dropped. Returns the number of plays saved.
async fn report_events(
    mut events: broadcast::Receiver<TrackerEvent>,
    logger: Arc<Logger>,
    endpoint: String,
    reconnect_delay: Duration,
) -> usize {
    let mut saved = 0;
    loop {
        match events.recv().await {
            Ok(TrackerEvent::PlayCommitted { record }) => {
                saved += 1;
                logger.log(&play_saved(&record));
            }
            Ok(TrackerEvent::Connectivity { status }) => {
                let event = match status {
                    ConnectionStatus::Connected => LogEvent::Connected {
                        endpoint: endpoint.clone(),
                    },
                    ConnectionStatus::Waiting => LogEvent::Waiting {
                        endpoint: endpoint.clone(),
                        retry_secs: reconnect_delay.as_secs_f64(),
                    },
                };
                logger.log(&event);
            }
            Ok(TrackerEvent::PersistenceFailed { error }) => {
                logger.log(&LogEvent::PersistenceFailed { error });
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event reporter fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    saved
}

fn play_saved(record: &PlayRecord) -> LogEvent {
    LogEvent::PlaySaved {
        id: record.id.clone(),
        artist: record.map_artist.clone(),
        title: record.map_title.clone(),
        difficulty: record.map_diff.clone(),
        mods: record.mods.to_string(),
        status: record.status.to_string(),
        rank: record.rank.clone(),
        score: record.score,
        accuracy: record.accuracy,
        pp: record.pp,
        max_combo: record.max_combo,
        misses: record.misses,
        duration_secs: record.duration_seconds,
    }
}
