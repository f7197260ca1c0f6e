//! End-to-end delivery over a real WebSocket.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use coach_bridge::{BridgeConfig, CoachBridge, ConnectionManager, ConnectionState, SharedText, WsTransport};
use coach_core::{EditorMessage, ProblemId};
use futures::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

struct Backend {
    url: String,
    accepted: Arc<AtomicUsize>,
    frames: mpsc::UnboundedReceiver<(usize, String)>,
}

/// Accepts connections and forwards text frames tagged with the connection
/// number. With `close_after_first`, each connection is closed by the server
/// after its first frame.
async fn spawn_backend(close_after_first: bool) -> Backend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let (tx, frames) = mpsc::unbounded_channel();

    let counter = Arc::clone(&accepted);
    let _ = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let tx = tx.clone();
            let _ = tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                while let Some(Ok(msg)) = ws.next().await {
                    if let Message::Text(text) = msg {
                        let _ = tx.send((n, text.as_str().to_owned()));
                        if close_after_first {
                            let _ = ws.close(None).await;
                            break;
                        }
                    }
                }
            });
        }
    });

    Backend {
        url: format!("ws://{addr}/ws"),
        accepted,
        frames,
    }
}

fn config(url: &str) -> BridgeConfig {
    BridgeConfig {
        ws_url: url.to_string(),
        quiet_period: Duration::from_millis(50),
        backoff_base: Duration::ZERO,
        ..BridgeConfig::default()
    }
}

fn message(code: &str) -> EditorMessage {
    EditorMessage {
        problem_id: ProblemId::parse("500A").unwrap(),
        code: code.to_string(),
        thoughts: String::new(),
    }
}

#[tokio::test]
async fn settled_edit_reaches_backend() {
    let mut backend = spawn_backend(false).await;
    let bridge = CoachBridge::connect_default(config(&backend.url));
    let mut reports = bridge.subscribe();

    let text = "// problem: 500A\nint x = 1; // think about edge cases\n";
    let id = bridge.open_document(Arc::new(SharedText::new("a.cpp", text)));
    assert!(bridge.on_change(&id));

    let report = reports.recv().await.unwrap();
    assert!(report.outcome.is_sent());

    let (conn, frame) = backend.frames.recv().await.unwrap();
    assert_eq!(conn, 1);
    let frame: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(frame["problemId"], "500A");
    assert_eq!(frame["code"], text);
    assert_eq!(frame["thoughts"], "think about edge cases");

    bridge.shutdown().await;
    assert_eq!(bridge.connection_state(), ConnectionState::Absent);
}

#[tokio::test]
async fn connection_is_reused() {
    let mut backend = spawn_backend(false).await;
    let manager = ConnectionManager::new(&config(&backend.url), Arc::new(WsTransport));

    for code in ["a", "b", "c"] {
        manager.send(&message(code)).await.unwrap();
    }
    for expected in ["a", "b", "c"] {
        let (conn, frame) = backend.frames.recv().await.unwrap();
        assert_eq!(conn, 1);
        assert!(frame.contains(&format!("\"code\":\"{expected}\"")));
    }
    assert_eq!(backend.accepted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn remote_close_leads_to_reconnect_on_next_send() {
    let mut backend = spawn_backend(true).await;
    let manager = ConnectionManager::new(&config(&backend.url), Arc::new(WsTransport));

    manager.send(&message("first")).await.unwrap();
    let (conn, _) = backend.frames.recv().await.unwrap();
    assert_eq!(conn, 1);

    let mut state = manager.subscribe();
    tokio::time::timeout(
        Duration::from_secs(2),
        state.wait_for(|s| *s == ConnectionState::Failed),
    )
    .await
    .expect("server close observed")
    .unwrap();
    assert_eq!(backend.accepted.load(Ordering::SeqCst), 1);

    // Sends racing the close may fail or be dropped; a later one reconnects.
    let mut second = None;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(25)).await;
        let _ = manager.send(&message("second")).await;
        if let Ok(Some(received)) =
            tokio::time::timeout(Duration::from_millis(50), backend.frames.recv()).await
        {
            second = Some(received);
            break;
        }
    }

    let (conn, frame) = second.unwrap();
    assert_eq!(conn, 2);
    assert!(frame.contains("second"));
}

#[tokio::test]
async fn unreachable_backend_is_reported() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let bridge = CoachBridge::connect_default(config(&format!("ws://127.0.0.1:{port}/ws")));
    let mut reports = bridge.subscribe();
    let id = bridge.open_document(Arc::new(SharedText::new("a.cpp", "// problem: 1A\n")));
    assert!(bridge.on_change(&id));

    let report = reports.recv().await.unwrap();
    assert!(!report.outcome.is_sent());
    assert_eq!(bridge.connection_state(), ConnectionState::Failed);
}
