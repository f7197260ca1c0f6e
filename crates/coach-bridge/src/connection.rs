//! Single owner of the outbound connection.
//!
//! ```text
//! Absent ──send──▶ Connecting ──ok──▶ Open ──send ok──▶ Open
//!                      │                 │
//!                    fail          send fail / remote close
//!                      ▼                 ▼
//!                   Failed ──next send (after backoff)──▶ Connecting
//! ```
//!
//! The slot is guarded by an async mutex held across check, connect and send,
//! so concurrent callers during a handshake queue behind it instead of
//! starting handshakes of their own.
//!
//! Each open connection gets a small watcher task that flips the state from
//! `Open` to `Failed` when the transport reports the connection gone. It
//! never reconnects; that stays with the next `send`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use coach_core::retry::backoff_delay;
use coach_core::{ConnectionId, EditorMessage};
use metrics::counter;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::transport::{FrameSink, Transport};

/// Observable connection state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no attempt yet.
    Absent,
    /// Handshake in flight.
    Connecting,
    /// Ready to send.
    Open,
    /// Last attempt failed; the next send retries.
    Failed,
}

impl ConnectionState {
    /// Lowercase name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Failed => "failed",
        }
    }
}

#[derive(Default)]
struct Slot {
    sink: Option<Box<dyn FrameSink>>,
    connection_id: Option<ConnectionId>,
    failures: u32,
    retry_at: Option<Instant>,
}

/// Lazily connects on first use and reuses the connection while it stays open.
pub struct ConnectionManager {
    url: String,
    transport: Arc<dyn Transport>,
    connect_timeout: Duration,
    backoff_base: Duration,
    backoff_max: Duration,
    slot: Mutex<Slot>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    /// Bumped per established or locally closed connection; a watcher only
    /// publishes while its generation is current.
    generation: Arc<AtomicU64>,
}

impl ConnectionManager {
    /// Create a manager. Nothing is connected until the first [`send`](Self::send).
    pub fn new(config: &BridgeConfig, transport: Arc<dyn Transport>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Absent);
        Self {
            url: config.ws_url.clone(),
            transport,
            connect_timeout: config.connect_timeout,
            backoff_base: config.backoff_base,
            backoff_max: config.backoff_max,
            slot: Mutex::new(Slot::default()),
            state_tx: Arc::new(state_tx),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Ensure a live connection, then hand one frame to the transport.
    ///
    /// On failure the connection is dropped and the error returned; the
    /// next call reconnects once the backoff window has passed.
    pub async fn send(&self, message: &EditorMessage) -> Result<(), BridgeError> {
        let frame = message
            .to_frame()
            .map_err(|e| BridgeError::Serialize(e.to_string()))?;

        let mut slot = self.slot.lock().await;

        if !slot.sink.as_ref().is_some_and(|sink| sink.is_open()) {
            if slot.sink.take().is_some() {
                if mark_lost(&self.state_tx) {
                    warn!(connection_id = ?slot.connection_id, "connection lost, reconnecting");
                } else {
                    debug!(connection_id = ?slot.connection_id, "connection no longer open");
                }
            }
            Self::check_backoff(&slot)?;
            self.establish(&mut slot).await?;
        }

        let Some(sink) = slot.sink.as_mut() else {
            return Err(BridgeError::Closed);
        };

        match sink.send_text(frame).await {
            Ok(()) => {
                counter!("coach_snapshots_sent_total").increment(1);
                debug!(
                    connection_id = ?slot.connection_id,
                    problem_id = %message.problem_id,
                    "frame sent"
                );
                Ok(())
            }
            Err(err) => {
                counter!("coach_send_failures_total").increment(1);
                self.record_failure(&mut slot, &err);
                Err(err)
            }
        }
    }

    /// Close the connection, if any, and return to `Absent`.
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(mut sink) = slot.sink.take() {
            if let Err(err) = sink.close().await {
                debug!(error = %err, "close handshake failed");
            }
            info!(connection_id = ?slot.connection_id, "connection closed");
        }
        *slot = Slot::default();
        let _ = self.state_tx.send_replace(ConnectionState::Absent);
    }

    fn check_backoff(slot: &Slot) -> Result<(), BridgeError> {
        match slot.retry_at {
            Some(at) if at > Instant::now() => Err(BridgeError::BackingOff {
                remaining: at - Instant::now(),
                failures: slot.failures,
            }),
            _ => Ok(()),
        }
    }

    async fn establish(&self, slot: &mut Slot) -> Result<(), BridgeError> {
        let connection_id = ConnectionId::new();
        let _ = self.state_tx.send_replace(ConnectionState::Connecting);
        counter!("coach_connect_attempts_total").increment(1);
        debug!(%connection_id, url = %self.url, attempt = slot.failures + 1, "connecting");

        let result =
            match tokio::time::timeout(self.connect_timeout, self.transport.connect(&self.url))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(BridgeError::ConnectTimeout {
                    url: self.url.clone(),
                    timeout: self.connect_timeout,
                }),
            };

        match result {
            Ok(sink) => {
                info!(%connection_id, url = %self.url, "connected to coaching backend");
                self.watch_for_close(sink.as_ref(), &connection_id);
                slot.sink = Some(sink);
                slot.connection_id = Some(connection_id);
                slot.failures = 0;
                slot.retry_at = None;
                let _ = self.state_tx.send_replace(ConnectionState::Open);
                Ok(())
            }
            Err(err) => {
                slot.connection_id = Some(connection_id);
                self.record_failure(slot, &err);
                Err(err)
            }
        }
    }

    fn watch_for_close(&self, sink: &dyn FrameSink, connection_id: &ConnectionId) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let state_tx = Arc::clone(&self.state_tx);
        let closed = sink.closed();
        let connection_id = connection_id.clone();
        let _ = tokio::spawn(async move {
            closed.cancelled().await;
            if current.load(Ordering::SeqCst) == generation && mark_lost(&state_tx) {
                counter!("coach_remote_closes_total").increment(1);
                warn!(%connection_id, "coaching backend closed the connection");
            }
        });
    }

    fn record_failure(&self, slot: &mut Slot, err: &BridgeError) {
        slot.sink = None;
        let delay = backoff_delay(
            slot.failures,
            duration_ms(self.backoff_base),
            duration_ms(self.backoff_max),
        );
        slot.failures = slot.failures.saturating_add(1);
        slot.retry_at = (!delay.is_zero()).then(|| Instant::now() + delay);
        let _ = self.state_tx.send_replace(ConnectionState::Failed);
        warn!(
            connection_id = ?slot.connection_id,
            error_kind = err.error_kind(),
            error = %err,
            failures = slot.failures,
            retry_in_ms = duration_ms(delay),
            "coaching backend unreachable"
        );
    }
}

/// `Open` becomes `Failed`; any other state is left alone.
fn mark_lost(state_tx: &watch::Sender<ConnectionState>) -> bool {
    state_tx.send_if_modified(|state| {
        if *state == ConnectionState::Open {
            *state = ConnectionState::Failed;
            true
        } else {
            false
        }
    })
}

#[allow(clippy::cast_possible_truncation)]
fn duration_ms(d: Duration) -> u64 {
    d.as_millis() as u64
}
