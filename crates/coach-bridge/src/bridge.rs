//! Entry point wiring sessions, debounce, dispatch and the shared connection.

use std::sync::Arc;

use coach_core::{DocumentId, Snapshot};
use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::dispatch::{DispatchReport, Dispatcher};
use crate::session::{DocumentSession, DocumentSource};
use crate::transport::Transport;
use crate::ws::WsTransport;

/// Receives change notifications for open documents and streams settled
/// snapshots to the coaching backend.
pub struct CoachBridge {
    config: BridgeConfig,
    runtime: Handle,
    dispatcher: Arc<Dispatcher>,
    sessions: DashMap<DocumentId, Arc<DocumentSession>>,
}

impl CoachBridge {
    /// Create a bridge on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new(config: BridgeConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_runtime(config, transport, Handle::current())
    }

    /// Create a bridge whose timers and dispatches run on `runtime`.
    pub fn with_runtime(config: BridgeConfig, transport: Arc<dyn Transport>, runtime: Handle) -> Self {
        let connection = Arc::new(ConnectionManager::new(&config, transport));
        let dispatcher = Arc::new(Dispatcher::new(connection, config.report_capacity));
        Self {
            config,
            runtime,
            dispatcher,
            sessions: DashMap::new(),
        }
    }

    /// Bridge speaking WebSocket to `config.ws_url`.
    pub fn connect_default(config: BridgeConfig) -> Self {
        Self::new(config, Arc::new(WsTransport))
    }

    /// Resolved configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Start watching a document.
    pub fn open_document(&self, source: Arc<dyn DocumentSource>) -> DocumentId {
        let session = Arc::new(DocumentSession::new(
            source,
            self.config.quiet_period,
            self.runtime.clone(),
        ));
        let id = session.id().clone();
        info!(document_id = %id, document = %session.label(), "document opened");
        let _ = self.sessions.insert(id.clone(), session);
        id
    }

    /// The document's text may have changed. Restarts its quiet period.
    ///
    /// Returns `false` for unknown or closed documents.
    pub fn on_change(&self, id: &DocumentId) -> bool {
        // release the map guard before touching the debouncer
        let Some(session) = self.sessions.get(id).map(|entry| Arc::clone(entry.value())) else {
            debug!(document_id = %id, "change for unknown document ignored");
            return false;
        };
        session.schedule(Arc::clone(&self.dispatcher))
    }

    /// Stop watching a document. Its pending analysis, if any, never fires.
    pub fn close_document(&self, id: &DocumentId) -> bool {
        match self.sessions.remove(id) {
            Some((_, session)) => {
                let cancelled = session.close();
                info!(document_id = %id, cancelled_pending = cancelled, "document closed");
                true
            }
            None => false,
        }
    }

    /// Snapshot stored by the document's last settled analysis.
    pub fn last_snapshot(&self, id: &DocumentId) -> Option<Arc<Snapshot>> {
        self.sessions.get(id)?.last_snapshot()
    }

    /// Whether the document has an analysis waiting to fire.
    pub fn has_pending(&self, id: &DocumentId) -> bool {
        self.sessions.get(id).is_some_and(|session| session.has_pending())
    }

    /// Receive the outcome of every settled firing.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchReport> {
        self.dispatcher.subscribe()
    }

    /// State of the shared connection.
    pub fn connection_state(&self) -> ConnectionState {
        self.dispatcher.connection().state()
    }

    /// Number of open documents.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Cancel all pending analyses, drop every session and close the connection.
    pub async fn shutdown(&self) {
        let ids: Vec<DocumentId> = self.sessions.iter().map(|entry| entry.key().clone()).collect();
        let mut cancelled = 0usize;
        for id in ids {
            if let Some((_, session)) = self.sessions.remove(&id) {
                if session.close() {
                    cancelled += 1;
                }
            }
        }
        self.dispatcher.connection().close().await;
        info!(cancelled_pending = cancelled, "bridge shut down");
    }
}
