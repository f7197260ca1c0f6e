//! In-memory transport for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::BridgeError;
use crate::transport::{FrameSink, Transport};

/// Records every handshake and frame; failures are toggled per test.
#[derive(Default)]
pub(crate) struct MockTransport {
    connects: AtomicUsize,
    frames: Arc<Mutex<Vec<String>>>,
    connect_delay: Mutex<Option<Duration>>,
    current: Mutex<Option<CancellationToken>>,
    graceful_close: Arc<AtomicBool>,
    pub fail_connect: AtomicBool,
    pub fail_send: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().clone()
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock() = Some(delay);
    }

    /// Simulate the backend dropping the current connection.
    pub fn close_remote(&self) {
        if let Some(closed) = self.current.lock().as_ref() {
            closed.cancel();
        }
    }

    pub fn closed_gracefully(&self) -> bool {
        self.graceful_close.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn FrameSink>, BridgeError> {
        let _ = self.connects.fetch_add(1, Ordering::SeqCst);
        let delay = *self.connect_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(BridgeError::Connect {
                url: url.to_string(),
                reason: "connection refused".into(),
            });
        }
        let closed = CancellationToken::new();
        *self.current.lock() = Some(closed.clone());
        Ok(Box::new(MockSink {
            closed,
            frames: Arc::clone(&self.frames),
            fail_send: Arc::clone(&self.fail_send),
            graceful_close: Arc::clone(&self.graceful_close),
        }))
    }
}

struct MockSink {
    closed: CancellationToken,
    frames: Arc<Mutex<Vec<String>>>,
    fail_send: Arc<AtomicBool>,
    graceful_close: Arc<AtomicBool>,
}

#[async_trait]
impl FrameSink for MockSink {
    async fn send_text(&mut self, text: String) -> Result<(), BridgeError> {
        if !self.is_open() {
            return Err(BridgeError::Closed);
        }
        if self.fail_send.load(Ordering::SeqCst) {
            self.closed.cancel();
            return Err(BridgeError::Send("broken pipe".into()));
        }
        self.frames.lock().push(text);
        Ok(())
    }

    fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.closed.cancel();
        self.graceful_close.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MockSink {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}
