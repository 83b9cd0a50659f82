use futures_util::StreamExt;
use playlog_core::{ConnectionStatus, Snapshot, StreamMessage};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::StreamError;
use crate::policy::ReconnectPolicy;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a connected session with the endpoint ended.
enum Disconnect {
    Shutdown,
    Closed,
}

/// Client for the snapshot endpoint.
pub struct SnapshotStream {
    url: String,
    policy: ReconnectPolicy,
    status: Option<ConnectionStatus>,
}

impl SnapshotStream {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            policy,
            status: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connect, forward snapshots and reconnect until shutdown is signalled or
    /// the receiving side goes away.
    pub async fn run(
        mut self,
        tx: mpsc::Sender<StreamMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), StreamError> {
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            let connected = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    continue;
                }
                connected = self.connect() => connected,
            };

            match connected {
                Ok(socket) => {
                    info!(url = %self.url, "Connected to snapshot stream");
                    self.report(&tx, ConnectionStatus::Connected).await?;
                    match self.pump(socket, &tx, &mut shutdown).await {
                        Ok(Disconnect::Shutdown) => return Ok(()),
                        Ok(Disconnect::Closed) => warn!(url = %self.url, "Snapshot stream closed"),
                        Err(StreamError::ChannelClosed) => return Err(StreamError::ChannelClosed),
                        Err(e) => warn!(error = %e, "Snapshot stream dropped"),
                    }
                }
                Err(e) => debug!(error = %e, "Snapshot endpoint unavailable"),
            }

            self.report(&tx, ConnectionStatus::Waiting).await?;

            let delay = self.policy.delay();
            debug!(?delay, "Waiting before reconnecting");
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn connect(&self) -> Result<Socket, StreamError> {
        let (socket, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|source| StreamError::Connect {
                url: self.url.clone(),
                source,
            })?;
        Ok(socket)
    }

    async fn pump(
        &self,
        mut socket: Socket,
        tx: &mpsc::Sender<StreamMessage>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Disconnect, StreamError> {
        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        let _ = socket.close(None).await;
                        return Ok(Disconnect::Shutdown);
                    }
                }
                message = socket.next() => match message {
                    Some(Ok(Message::Text(text))) => self.forward(&text, tx).await?,
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => self.forward(text, tx).await?,
                        Err(_) => debug!(len = bytes.len(), "Skipping non-UTF-8 frame"),
                    },
                    Some(Ok(Message::Close(_))) | None => return Ok(Disconnect::Closed),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(StreamError::Read(e)),
                },
            }
        }
    }

    async fn forward(&self, payload: &str, tx: &mpsc::Sender<StreamMessage>) -> Result<(), StreamError> {
        match Snapshot::from_json(payload) {
            Ok(snapshot) => tx
                .send(StreamMessage::Snapshot(Box::new(snapshot)))
                .await
                .map_err(|_| StreamError::ChannelClosed),
            Err(e) => {
                debug!(error = %e, "Ignoring malformed snapshot");
                Ok(())
            }
        }
    }

    async fn report(
        &mut self,
        tx: &mpsc::Sender<StreamMessage>,
        status: ConnectionStatus,
    ) -> Result<(), StreamError> {
        if self.status == Some(status) {
            return Ok(());
        }
        self.status = Some(status);
        tx.send(StreamMessage::Status(status))
            .await
            .map_err(|_| StreamError::ChannelClosed)
    }
}
