//! Capture tracing events in memory for assertions in tests.
//!
//! Used by the bridge tests to check that transport failures are observed
//! (logged) without being raised to the caller.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// One recorded event.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// Level it was emitted at.
    pub level: Level,
    /// Emitting module path.
    pub target: String,
    /// Rendered message.
    pub message: String,
    /// Structured fields other than the message, in emission order.
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    /// Value of a structured field, if recorded.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Shared handle to the recorded events.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    fn lock(&self) -> MutexGuard<'_, Vec<CapturedEvent>> {
        match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.lock().clone()
    }

    /// Whether any message contains `needle`.
    pub fn has_message(&self, needle: &str) -> bool {
        self.lock().iter().any(|e| e.message.contains(needle))
    }

    /// Whether an event at `level` has a message containing `needle`.
    pub fn has_event(&self, level: Level, needle: &str) -> bool {
        self.lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }

    /// Number of events at `level`.
    pub fn count_at_level(&self, level: Level) -> usize {
        self.lock().iter().filter(|e| e.level == level).count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

struct CaptureLayer(CapturedLogs);

/// Splits an event into its message and the remaining structured fields.
#[derive(Default)]
struct EventFields {
    message: String,
    fields: Vec<(String, String)>,
}

impl EventFields {
    fn put(&mut self, name: &str, value: String) {
        if name == "message" {
            self.message = value;
        } else {
            self.fields.push((name.to_owned(), value));
        }
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field.name(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field.name(), format!("{value:?}"));
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut recorded = EventFields::default();
        event.record(&mut recorded);
        let meta = event.metadata();
        self.0.lock().push(CapturedEvent {
            level: *meta.level(),
            target: meta.target().to_owned(),
            message: recorded.message,
            fields: recorded.fields,
        });
    }
}

/// Install a thread-local subscriber that records every event.
///
/// Keep the guard alive for the whole test. Only events emitted on the
/// current thread are seen, which covers `#[tokio::test]` (current-thread
/// runtime) including tasks it spawns.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let guard = tracing_subscriber::registry()
        .with(CaptureLayer(logs.clone()))
        .with(LevelFilter::TRACE)
        .set_default();
    (logs, guard)
}
