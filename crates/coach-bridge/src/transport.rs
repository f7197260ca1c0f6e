//! Transport seam between the connection manager and the wire.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BridgeError;

/// Opens outbound connections.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the handshake and return a sink for text frames.
    async fn connect(&self, url: &str) -> Result<Box<dyn FrameSink>, BridgeError>;
}

/// The write half of an open connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Hand one text frame to the transport. No acknowledgment is awaited.
    async fn send_text(&mut self, text: String) -> Result<(), BridgeError>;

    /// Cancelled once the connection is gone: remote close, read error,
    /// failed send, local close or drop.
    fn closed(&self) -> CancellationToken;

    /// `false` once [`closed`](Self::closed) has fired.
    fn is_open(&self) -> bool {
        !self.closed().is_cancelled()
    }

    /// Close gracefully.
    async fn close(&mut self) -> Result<(), BridgeError>;
}
