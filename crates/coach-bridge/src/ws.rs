//! WebSocket transport over `tokio-tungstenite`.
//!
//! The backend never answers on this socket, so the read half is drained by a
//! background task whose only job is to notice when the connection goes away
//! and cancel the sink's close token.

use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::transport::{FrameSink, Transport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production [`Transport`] speaking plain WebSocket.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn FrameSink>, BridgeError> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| BridgeError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let (sink, mut stream) = ws.split();
        let closed = CancellationToken::new();

        let reader_closed = closed.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Close(frame)) => {
                        debug!(?frame, "backend closed the connection");
                        break;
                    }
                    // inbound frames are not consumed
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "websocket read failed");
                        break;
                    }
                }
            }
            reader_closed.cancel();
        });

        Ok(Box::new(WsSink {
            sink,
            closed,
            reader,
        }))
    }
}

struct WsSink {
    sink: SplitSink<WsStream, Message>,
    closed: CancellationToken,
    reader: JoinHandle<()>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<(), BridgeError> {
        if !self.is_open() {
            return Err(BridgeError::Closed);
        }
        self.sink.send(Message::Text(text.into())).await.map_err(|e| {
            self.closed.cancel();
            BridgeError::Send(e.to_string())
        })
    }

    fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.closed.cancel();
        self.sink
            .close()
            .await
            .map_err(|e| BridgeError::Send(e.to_string()))
    }
}

impl Drop for WsSink {
    fn drop(&mut self) {
        self.reader.abort();
        self.closed.cancel();
    }
}
