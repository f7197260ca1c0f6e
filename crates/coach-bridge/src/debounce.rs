//! Trailing-edge debounce: only the last change in a burst fires.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::counter;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// A scheduled, cancellable analysis.
///
/// Cancelling before the quiet period elapses guarantees the work never
/// starts. Once the work has started it runs to completion.
pub struct PendingAnalysis {
    cancel: CancellationToken,
    fired: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl PendingAnalysis {
    /// Run `work` after `quiet` unless cancelled first.
    pub fn spawn<F>(runtime: &Handle, quiet: Duration, work: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let fired = Arc::new(AtomicBool::new(false));
        let started = Arc::clone(&fired);
        let handle = runtime.spawn(async move {
            let elapsed = tokio::select! {
                biased;
                () = token.cancelled() => false,
                () = tokio::time::sleep(quiet) => true,
            };
            if elapsed && !token.is_cancelled() {
                started.store(true, Ordering::Release);
                work.await;
            }
        });
        Self {
            cancel,
            fired,
            handle,
        }
    }

    /// Cancel the pending work. No-op if it already started or finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the quiet period elapsed and the work started.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Whether the task has completed (fired, or observed cancellation).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Still inside the quiet period: not fired, not cancelled.
    pub fn is_waiting(&self) -> bool {
        !self.has_fired() && !self.is_cancelled() && !self.is_finished()
    }
}

/// Holds at most one pending analysis per document.
pub struct Debouncer {
    quiet_period: Duration,
    runtime: Handle,
    pending: Mutex<Option<PendingAnalysis>>,
}

impl Debouncer {
    /// Create a debouncer that spawns onto `runtime`.
    pub fn new(quiet_period: Duration, runtime: Handle) -> Self {
        Self {
            quiet_period,
            runtime,
            pending: Mutex::new(None),
        }
    }

    /// Configured quiet period.
    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Replace any pending analysis with `work`, restarting the quiet period.
    pub fn schedule<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let next = PendingAnalysis::spawn(&self.runtime, self.quiet_period, work);
        let previous = self.pending.lock().replace(next);
        if let Some(previous) = previous {
            if previous.is_waiting() {
                counter!("coach_debounce_superseded_total").increment(1);
                trace!("superseded pending analysis");
            }
            previous.cancel();
        }
    }

    /// Cancel the pending analysis. Returns `true` if one was still waiting
    /// and will now never fire. An analysis already running is left to finish.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(pending) => {
                let waiting = pending.is_waiting();
                pending.cancel();
                waiting
            }
            None => false,
        }
    }

    /// Whether an analysis is waiting for its quiet period. `false` once it
    /// has fired, even while its dispatch is still in flight.
    pub fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(PendingAnalysis::is_waiting)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().take() {
            pending.cancel();
        }
    }
}
