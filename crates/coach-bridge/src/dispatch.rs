//! Runs once per settled edit: extract, store, and send when tagged.

use std::sync::Arc;

use coach_core::{DocumentId, ProblemId};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::connection::ConnectionManager;
use crate::error::BridgeError;
use crate::session::DocumentSession;

/// Result of one settled firing.
#[derive(Clone, Debug)]
pub enum DispatchOutcome {
    /// No problem tag; nothing was sent.
    Untagged,
    /// Frame handed to the transport.
    Sent {
        /// Problem the frame was tagged with.
        problem_id: ProblemId,
    },
    /// Delivery failed; the next settled edit retries.
    Failed {
        /// Problem the frame was tagged with.
        problem_id: ProblemId,
        /// Cause.
        error: BridgeError,
    },
}

impl DispatchOutcome {
    /// Whether a frame reached the transport.
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Outcome published to subscribers, tagged with its document.
#[derive(Clone, Debug)]
pub struct DispatchReport {
    /// Document the firing belonged to.
    pub document_id: DocumentId,
    /// What happened.
    pub outcome: DispatchOutcome,
}

/// Hands snapshots of settled documents to the connection manager.
pub struct Dispatcher {
    connection: Arc<ConnectionManager>,
    reports: broadcast::Sender<DispatchReport>,
}

impl Dispatcher {
    /// Create a dispatcher publishing up to `report_capacity` unread reports.
    pub fn new(connection: Arc<ConnectionManager>, report_capacity: usize) -> Self {
        let (reports, _) = broadcast::channel(report_capacity.max(1));
        Self {
            connection,
            reports,
        }
    }

    /// Connection manager shared by all sessions.
    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    /// Receive every future outcome.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchReport> {
        self.reports.subscribe()
    }

    /// Analyse `session` and send the snapshot if it is tagged.
    ///
    /// Failures are logged and reported, never returned as errors.
    pub async fn dispatch(&self, session: &DocumentSession) -> DispatchOutcome {
        let snapshot = session.analyse().await;

        let outcome = match snapshot.to_message() {
            None => {
                debug!(document_id = %session.id(), "no problem tag, nothing to send");
                DispatchOutcome::Untagged
            }
            Some(message) => {
                let problem_id = message.problem_id.clone();
                match self.connection.send(&message).await {
                    Ok(()) => {
                        debug!(document_id = %session.id(), %problem_id, "snapshot sent");
                        DispatchOutcome::Sent { problem_id }
                    }
                    Err(error) => {
                        warn!(
                            document_id = %session.id(),
                            document = %session.label(),
                            %problem_id,
                            error_kind = error.error_kind(),
                            error = %error,
                            "snapshot not delivered"
                        );
                        DispatchOutcome::Failed { problem_id, error }
                    }
                }
            }
        };

        // no subscribers is fine
        let _ = self.reports.send(DispatchReport {
            document_id: session.id().clone(),
            outcome: outcome.clone(),
        });
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use tokio::runtime::Handle;

    use super::*;
    use crate::config::BridgeConfig;
    use crate::session::SharedText;
    use crate::testing::MockTransport;

    fn setup(transport: &Arc<MockTransport>) -> Dispatcher {
        let config = BridgeConfig {
            backoff_base: Duration::ZERO,
            ..BridgeConfig::default()
        };
        Dispatcher::new(Arc::new(ConnectionManager::new(&config, transport.clone())), 8)
    }

    fn session(text: &str) -> DocumentSession {
        DocumentSession::new(
            Arc::new(SharedText::new("main.cpp", text)),
            Duration::from_millis(10),
            Handle::current(),
        )
    }

    #[tokio::test]
    async fn untagged_document_never_connects() {
        let transport = MockTransport::new();
        let dispatcher = setup(&transport);
        let outcome = dispatcher.dispatch(&session("int main() {}\n// just notes")).await;

        assert_matches!(outcome, DispatchOutcome::Untagged);
        assert_eq!(transport.connects(), 0);
    }

    #[tokio::test]
    async fn tagged_document_is_sent_and_reported() {
        let transport = MockTransport::new();
        let dispatcher = setup(&transport);
        let mut reports = dispatcher.subscribe();
        let session = session("// problem: 500a\nint x;");

        let outcome = dispatcher.dispatch(&session).await;
        assert!(outcome.is_sent());

        let report = reports.recv().await.unwrap();
        assert_eq!(&report.document_id, session.id());
        assert_matches!(report.outcome, DispatchOutcome::Sent { problem_id } if problem_id.as_str() == "500A");
        assert!(session.last_snapshot().is_some());
    }

    #[tokio::test]
    async fn transport_failure_is_observed_not_raised() {
        let transport = MockTransport::new();
        transport.fail_connect.store(true, Ordering::SeqCst);
        let dispatcher = setup(&transport);
        let (logs, _guard) = coach_logging::test_utils::capture_logs();

        let outcome = dispatcher.dispatch(&session("// problem: 9Z\n")).await;

        assert_matches!(
            outcome,
            DispatchOutcome::Failed { error: BridgeError::Connect { .. }, .. }
        );
        assert!(logs.has_event(tracing::Level::WARN, "snapshot not delivered"));
        assert!(logs.has_event(tracing::Level::WARN, "coaching backend unreachable"));
    }
}
