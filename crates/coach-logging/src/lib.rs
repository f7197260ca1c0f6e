//! # coach-logging
//!
//! Structured logging with `tracing`.
//!
//! - [`init_subscriber`] installs the process-wide stderr subscriber
//! - [`test_utils::capture_logs`] captures events in memory for assertions
//!
//! Context such as `document_id` and `problem_id` travels as structured
//! fields on each event rather than in the message text.

#![deny(unsafe_code)]

pub mod test_utils;

pub use coach_settings::{LogFormat, LoggingSettings};
pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber on stderr.
///
/// `RUST_LOG` takes precedence over `level`. Subsequent calls are no-ops.
pub fn init_subscriber(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // try_init fails only if a global subscriber is already set
    let _ = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };
}

/// Initialize from the `logging` settings section.
pub fn init_from_settings(settings: &LoggingSettings) {
    init_subscriber(&settings.level, settings.format);
}
