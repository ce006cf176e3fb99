//! Lifecycle event callbacks

use relay_domain::{AssertionResult, AttemptRequest, ConsoleEntry, TestResult, VariableMap};

use super::http_send::CancellationToken;

/// Summary of a finished folder or collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Requests that ran to completion.
    pub completed: usize,
    /// Requests skipped by `skipRequest`.
    pub skipped: usize,
    /// Requests that ended with a terminal error.
    pub errored: usize,
    /// Assertions and tests that passed.
    pub passed: usize,
    /// Assertions and tests that failed.
    pub failed: usize,
}

/// Callbacks fired while a request or run progresses.
///
/// Every method has a no-op default, so subscribers only implement what
/// they care about.
pub trait RequestEvents: Send + Sync {
    /// The request entered the pipeline.
    fn request_queued(&self, _uid: &str) {}

    /// An attempt is about to go on the wire.
    fn request_sent(&self, _uid: &str, _request: &AttemptRequest) {}

    /// Declarative assertions were evaluated.
    fn assertion_results(&self, _uid: &str, _results: &[AssertionResult]) {}

    /// Script tests were recorded.
    fn test_results(&self, _uid: &str, _results: &[TestResult]) {}

    /// A script replaced the environment or runtime bags.
    fn update_script_environment(&self, _uid: &str, _environment: &VariableMap, _runtime: &VariableMap) {}

    /// The final response carried `Set-Cookie` headers.
    fn cookie_updated(&self, _uid: &str, _set_cookie: &[String]) {}

    /// A script wrote to its console.
    fn console_log(&self, _uid: &str, _entry: &ConsoleEntry) {}

    /// A folder or collection run began.
    fn folder_run_started(&self, _folder: &str, _total_requests: usize) {}

    /// One request of a run finished.
    fn folder_request_completed(&self, _folder: &str, _uid: &str, _name: &str) {}

    /// A folder or collection run finished.
    fn folder_run_completed(&self, _folder: &str, _summary: &RunSummary) {}
}

/// Subscriber that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl RequestEvents for NoopEvents {}

/// Forwards events until the abort token fires, then drops them.
pub struct GatedEvents<'a> {
    inner: &'a dyn RequestEvents,
    cancel: &'a CancellationToken,
}

impl<'a> GatedEvents<'a> {
    /// Wraps `inner`, gated on `cancel`.
    #[must_use]
    pub const fn new(inner: &'a dyn RequestEvents, cancel: &'a CancellationToken) -> Self {
        Self { inner, cancel }
    }

    /// Runs `f` against the subscriber unless the run was aborted.
    pub fn emit(&self, f: impl FnOnce(&dyn RequestEvents)) {
        if !self.cancel.is_cancelled() {
            f(self.inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl RequestEvents for Recorder {
        fn request_queued(&self, uid: &str) {
            if let Ok(mut seen) = self.0.lock() {
                seen.push(uid.to_string());
            }
        }
    }

    #[test]
    fn gate_drops_events_after_abort() {
        let recorder = Recorder::default();
        let cancel = CancellationToken::new();
        let gate = GatedEvents::new(&recorder, &cancel);

        gate.emit(|e| e.request_queued("first"));
        cancel.cancel();
        gate.emit(|e| e.request_queued("second"));

        let seen = recorder.0.lock().map(|s| s.clone()).unwrap_or_default();
        assert_eq!(seen, vec!["first".to_string()]);
    }

    #[test]
    fn unsubscribed_callbacks_are_noops() {
        let events = NoopEvents;
        events.cookie_updated("uid", &["a=b".to_string()]);
        events.folder_run_completed("root", &RunSummary::default());
    }
}
