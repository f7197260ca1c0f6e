//! # coach-bridge
//!
//! Watches open documents, waits for editing to settle, extracts a
//! [`Snapshot`](coach_core::Snapshot) and streams it to the coaching backend
//! over one lazily established WebSocket.
//!
//! ```text
//! on_change ─▶ Debouncer ─(quiet period)─▶ Dispatcher ─▶ ConnectionManager ─▶ /ws
//!                 │                          │
//!          cancels superseded          extract + store
//! ```
//!
//! Delivery is best effort: failures are logged and published as
//! [`DispatchReport`]s, never raised to the editor.

#![deny(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod connection;
pub mod debounce;
pub mod dispatch;
pub mod error;
pub mod session;
pub mod transport;
pub mod ws;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::CoachBridge;
pub use config::BridgeConfig;
pub use connection::{ConnectionManager, ConnectionState};
pub use debounce::{Debouncer, PendingAnalysis};
pub use dispatch::{DispatchOutcome, DispatchReport, Dispatcher};
pub use error::BridgeError;
pub use session::{DocumentSession, DocumentSource, SharedText};
pub use transport::{FrameSink, Transport};
pub use ws::WsTransport;
