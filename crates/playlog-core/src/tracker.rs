use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info};

use crate::engine::SessionEngine;
use crate::error::StoreError;
use crate::filter::{NoiseFilter, Rejection};
use crate::record::PlayRecord;
use crate::snapshot::Snapshot;
use crate::store::PlayStore;

/// Connectivity of the snapshot stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Waiting,
}

/// Items delivered by the stream adapter, in arrival order.
#[derive(Debug, Clone)]
pub enum StreamMessage {
    Snapshot(Box<Snapshot>),
    Status(ConnectionStatus),
}

/// Notifications for the presentation side.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackerEvent {
    PlayCommitted { record: PlayRecord },
    Connectivity { status: ConnectionStatus },
    PersistenceFailed { error: String },
}

/// What happened to a session the engine closed.
#[derive(Debug)]
pub enum Disposition {
    Committed(PlayRecord),
    Rejected(Rejection),
    PersistFailed(StoreError),
}

/// Drives the session engine from the snapshot channel and commits the
/// records that survive the noise filter.
pub struct Tracker {
    engine: SessionEngine,
    filter: NoiseFilter,
    store: Arc<dyn PlayStore>,
    events: broadcast::Sender<TrackerEvent>,
}

impl Tracker {
    pub fn new(engine: SessionEngine, filter: NoiseFilter, store: Arc<dyn PlayStore>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            engine,
            filter,
            store,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    /// Consume the stream until it closes or shutdown is signalled.
    ///
    /// A session still open at that point is dropped.
    pub async fn run(
        &mut self,
        mut rx: mpsc::Receiver<StreamMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if !*shutdown.borrow() {
            loop {
                tokio::select! {
                    biased;

                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Tracker shutting down");
                            break;
                        }
                    }
                    message = rx.recv() => {
                        match message {
                            Some(StreamMessage::Snapshot(snapshot)) => {
                                self.handle_snapshot(&snapshot, Utc::now());
                            }
                            Some(StreamMessage::Status(status)) => self.handle_status(status),
                            None => {
                                debug!("Snapshot channel closed");
                                break;
                            }
                        }
                    }
                }
            }
        }

        self.engine.abandon();
    }

    /// Feed one snapshot through the engine and, if a session closed, through
    /// the filter and into the store.
    pub fn handle_snapshot(&mut self, snapshot: &Snapshot, now: DateTime<Utc>) -> Option<Disposition> {
        let candidate = self.engine.handle(snapshot, now)?;
        Some(self.commit(candidate))
    }

    pub fn handle_status(&mut self, status: ConnectionStatus) {
        info!(?status, "Snapshot stream connectivity changed");
        let _ = self.events.send(TrackerEvent::Connectivity { status });
    }

    fn commit(&mut self, candidate: PlayRecord) -> Disposition {
        if let Err(rejection) = self.filter.check_record(&candidate) {
            return self.reject(&candidate, rejection);
        }

        let recent = match self.store.recent(self.filter.thresholds().duplicate_window) {
            Ok(recent) => recent,
            Err(e) => return self.persistence_failed(&candidate, e),
        };
        if let Err(rejection) = self.filter.check_duplicate(&candidate, &recent) {
            return self.reject(&candidate, rejection);
        }

        match self.store.append(&candidate) {
            Ok(()) => {
                info!(
                    id = %candidate.id,
                    title = %candidate.map_title,
                    status = %candidate.status,
                    duration_secs = candidate.duration_seconds,
                    "Play saved"
                );
                let _ = self.events.send(TrackerEvent::PlayCommitted {
                    record: candidate.clone(),
                });
                Disposition::Committed(candidate)
            }
            Err(e) => self.persistence_failed(&candidate, e),
        }
    }

    fn reject(&self, candidate: &PlayRecord, rejection: Rejection) -> Disposition {
        info!(
            title = %candidate.map_title,
            status = %candidate.status,
            reason = %rejection,
            "Discarded play"
        );
        Disposition::Rejected(rejection)
    }

    fn persistence_failed(&self, candidate: &PlayRecord, e: StoreError) -> Disposition {
        error!(title = %candidate.map_title, error = %e, "Failed to save play");
        let _ = self.events.send(TrackerEvent::PersistenceFailed {
            error: e.to_string(),
        });
        Disposition::PersistFailed(e)
    }
}
