use std::time::Duration;

use futures_util::SinkExt;
use playlog_core::{ConnectionStatus, MenuState, StreamMessage};
use playlog_stream::{ReconnectPolicy, SnapshotStream, StreamError};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;

fn snapshot_json(state: i32, score: i64) -> String {
    json!({
        "menu": {
            "state": state,
            "bm": {
                "id": 1_094_582,
                "metadata": {"artist": "Camellia", "title": "Galaxy Collapse"},
                "time": {"current": 1500}
            },
            "mods": {"str": "HR"}
        },
        "gameplay": {"name": "rafis", "score": score}
    })
    .to_string()
}

/// Accept `connections` clients in turn, send each its frames, then close.
async fn serve(listener: TcpListener, connections: Vec<Vec<Message>>) {
    for frames in connections {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        for frame in frames {
            ws.send(frame).await.unwrap();
        }
        let _ = ws.close(None).await;
    }
}

async fn next(rx: &mut mpsc::Receiver<StreamMessage>) -> StreamMessage {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for stream message")
        .expect("stream channel closed")
}

fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy::fixed(Duration::from_millis(50))
}

#[tokio::test]
async fn test_forwards_snapshots_and_skips_malformed() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve(
        listener,
        vec![vec![
            Message::Text(snapshot_json(2, 1000)),
            Message::Text("not json at all".to_string()),
            Message::Text(r#"{"menu": {"state": 2}}"#.to_string()),
            Message::Binary(snapshot_json(7, 2000).into_bytes()),
        ]],
    ));

    let (tx, mut rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let client = tokio::spawn(SnapshotStream::new(format!("ws://{addr}"), fast_policy()).run(tx, shutdown_rx));

    assert!(matches!(
        next(&mut rx).await,
        StreamMessage::Status(ConnectionStatus::Connected)
    ));
    match next(&mut rx).await {
        StreamMessage::Snapshot(snap) => {
            assert_eq!(snap.menu_state, MenuState::Playing);
            assert_eq!(snap.gameplay.score, 1000);
            assert_eq!(snap.beatmap.title, "Galaxy Collapse");
            assert_eq!(snap.mods.as_str(), "HR");
        }
        other => panic!("expected snapshot, got {:?}", other),
    }
    match next(&mut rx).await {
        StreamMessage::Snapshot(snap) => {
            assert_eq!(snap.menu_state, MenuState::Results);
            assert_eq!(snap.gameplay.score, 2000);
        }
        other => panic!("expected snapshot, got {:?}", other),
    }
    assert!(matches!(
        next(&mut rx).await,
        StreamMessage::Status(ConnectionStatus::Waiting)
    ));

    shutdown_tx.send(true).unwrap();
    client.await.unwrap().unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_reconnects_after_server_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve(
        listener,
        vec![
            vec![Message::Text(snapshot_json(2, 10))],
            vec![Message::Text(snapshot_json(2, 20))],
        ],
    ));

    let (tx, mut rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let client = tokio::spawn(SnapshotStream::new(format!("ws://{addr}"), fast_policy()).run(tx, shutdown_rx));

    let mut scores = Vec::new();
    let mut statuses = Vec::new();
    while scores.len() < 2 || statuses.len() < 4 {
        match next(&mut rx).await {
            StreamMessage::Snapshot(snap) => scores.push(snap.gameplay.score),
            StreamMessage::Status(status) => statuses.push(status),
        }
    }

    assert_eq!(scores, vec![10, 20]);
    assert_eq!(
        statuses,
        vec![
            ConnectionStatus::Connected,
            ConnectionStatus::Waiting,
            ConnectionStatus::Connected,
            ConnectionStatus::Waiting,
        ]
    );

    shutdown_tx.send(true).unwrap();
    client.await.unwrap().unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_unreachable_endpoint_reports_waiting_once() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (tx, mut rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let client = tokio::spawn(SnapshotStream::new(format!("ws://{addr}"), fast_policy()).run(tx, shutdown_rx));

    assert!(matches!(
        next(&mut rx).await,
        StreamMessage::Status(ConnectionStatus::Waiting)
    ));

    // Several retry cycles pass without repeating the status.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), client)
        .await
        .expect("stream did not stop on shutdown")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_stops_when_receiver_dropped() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (tx, rx) = mpsc::channel(16);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    drop(rx);

    let result = SnapshotStream::new(format!("ws://{addr}"), fast_policy())
        .run(tx, shutdown_rx)
        .await;
    assert!(matches!(result, Err(StreamError::ChannelClosed)));
}
