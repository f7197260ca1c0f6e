//! One watched document and its pending analysis.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use coach_core::{DocumentId, Snapshot, extract};
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tracing::trace;

use crate::debounce::Debouncer;
use crate::dispatch::Dispatcher;

/// The host editor's view of a document.
///
/// Change notifications carry no payload, so the text is pulled through this
/// trait when an analysis actually fires. Implementations backed by blocking
/// I/O should move it off the runtime (`spawn_blocking`).
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Full current text.
    async fn text(&self) -> String;

    /// Human-readable name for logs.
    fn label(&self) -> String {
        "untitled".to_string()
    }
}

/// In-memory [`DocumentSource`] shared between an editor and the bridge.
#[derive(Clone, Debug, Default)]
pub struct SharedText {
    label: String,
    text: Arc<RwLock<String>>,
}

impl SharedText {
    /// Create a buffer with initial contents.
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: Arc::new(RwLock::new(text.into())),
        }
    }

    /// Replace the contents.
    pub fn set(&self, text: impl Into<String>) {
        *self.text.write() = text.into();
    }
}

#[async_trait]
impl DocumentSource for SharedText {
    async fn text(&self) -> String {
        self.text.read().clone()
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

/// Per-document state: identity, debouncer, last snapshot.
pub struct DocumentSession {
    id: DocumentId,
    source: Arc<dyn DocumentSource>,
    debouncer: Debouncer,
    last_snapshot: RwLock<Option<Arc<Snapshot>>>,
    closed: AtomicBool,
}

impl DocumentSession {
    /// Create a session for `source`.
    pub fn new(source: Arc<dyn DocumentSource>, quiet_period: Duration, runtime: Handle) -> Self {
        Self {
            id: DocumentId::new(),
            source,
            debouncer: Debouncer::new(quiet_period, runtime),
            last_snapshot: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Session identity.
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// Label of the underlying document.
    pub fn label(&self) -> String {
        self.source.label()
    }

    /// Re-read the document, extract, and store the result as the last snapshot.
    pub async fn analyse(&self) -> Arc<Snapshot> {
        let text = self.source.text().await;
        let snapshot = Arc::new(extract(&text));
        *self.last_snapshot.write() = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// Last stored snapshot, if an analysis has fired.
    pub fn last_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.last_snapshot.read().clone()
    }

    /// Restart the quiet period; on expiry `dispatcher` runs against this session.
    ///
    /// Returns `false` once the session is closed.
    pub fn schedule(self: &Arc<Self>, dispatcher: Arc<Dispatcher>) -> bool {
        if self.is_closed() {
            return false;
        }
        let session: Weak<Self> = Arc::downgrade(self);
        self.debouncer.schedule(async move {
            let Some(session) = session.upgrade() else {
                return;
            };
            if session.is_closed() {
                return;
            }
            let _ = dispatcher.dispatch(&session).await;
        });
        trace!(document_id = %self.id, quiet_period = ?self.debouncer.quiet_period(), "analysis scheduled");
        true
    }

    /// Whether an analysis is waiting for its quiet period.
    pub fn has_pending(&self) -> bool {
        self.debouncer.has_pending()
    }

    /// Mark closed and cancel any pending analysis. Returns `true` if one was cancelled.
    pub fn close(&self) -> bool {
        self.closed.store(true, Ordering::Release);
        self.debouncer.cancel()
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for DocumentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSession")
            .field("id", &self.id)
            .field("label", &self.source.label())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
