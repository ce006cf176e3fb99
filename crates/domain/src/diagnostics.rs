//! Append-only recorders threaded through the lifecycle: timeline, timings, debug log.

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::exchange::{AttemptClassification, AttemptRecord};
use crate::request::{Headers, HttpMethod};

/// One timeline row per transport attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    /// When the attempt was sent.
    pub timestamp: DateTime<Utc>,
    /// Method sent.
    pub method: HttpMethod,
    /// URL sent.
    pub url: String,
    /// Request headers as sent.
    pub request_headers: Headers,
    /// Response status.
    pub status: u16,
    /// Response headers.
    pub response_headers: Headers,
    /// Round-trip time in milliseconds.
    pub duration_ms: u64,
    /// Attempt classification.
    pub classification: AttemptClassification,
    /// Annotation, e.g. `redirect limit reached`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl From<&AttemptRecord> for TimelineEntry {
    fn from(record: &AttemptRecord) -> Self {
        Self {
            timestamp: record.sent_at,
            method: record.request.method,
            url: record.request.url.clone(),
            request_headers: record.request.headers.clone(),
            status: record.response.status,
            response_headers: record.response.headers.clone(),
            duration_ms: record.response.duration_millis(),
            classification: record.classification,
            note: (!record.response.annotations.is_empty())
                .then(|| record.response.annotations.join("; ")),
        }
    }
}

/// Ordered record of every attempt, including redirects and challenges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    /// Appends an entry.
    pub fn push(&mut self, entry: TimelineEntry) {
        self.entries.push(entry);
    }

    /// All entries.
    #[must_use]
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }
}

/// A closed measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    /// Timer name (`request`, `pre-script`, `post-script`, `test`, `total`).
    pub name: String,
    /// Elapsed milliseconds.
    pub duration_ms: u64,
    /// True when closed by `finalize` rather than by its owner.
    pub forced: bool,
}

/// Named stopwatch set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timings {
    #[serde(skip)]
    running: HashMap<String, Instant>,
    finished: Vec<Timing>,
}

impl Timings {
    /// Starts (or restarts) a timer.
    pub fn start(&mut self, name: &str) {
        self.running.insert(name.to_string(), Instant::now());
    }

    /// Stops a timer. Unknown names are ignored.
    pub fn stop(&mut self, name: &str) {
        self.close(name, false);
    }

    /// Force-closes every timer still running.
    pub fn finalize(&mut self) {
        let mut names: Vec<String> = self.running.keys().cloned().collect();
        names.sort();
        for name in names {
            self.close(&name, true);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn close(&mut self, name: &str, forced: bool) {
        if let Some(started) = self.running.remove(name) {
            self.finished.push(Timing {
                name: name.to_string(),
                duration_ms: started.elapsed().as_millis() as u64,
                forced,
            });
        }
    }

    /// Returns true if `name` is running.
    #[must_use]
    pub fn is_running(&self, name: &str) -> bool {
        self.running.contains_key(name)
    }

    /// Closed measurement for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Timing> {
        self.finished.iter().rev().find(|t| t.name == name)
    }

    /// All closed measurements, in closing order.
    #[must_use]
    pub fn finished(&self) -> &[Timing] {
        &self.finished
    }
}

/// Severity of a debug log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    /// Progress.
    Info,
    /// Something the user may want to fix.
    Warn,
    /// A stage failed.
    Error,
}

/// One debug log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugEntry {
    /// When it was written.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: DebugLevel,
    /// Pipeline stage name.
    pub stage: String,
    /// Message.
    pub message: String,
    /// Optional structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Append-only debug log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DebugLog {
    entries: Vec<DebugEntry>,
}

impl DebugLog {
    /// Appends an entry.
    pub fn log(&mut self, level: DebugLevel, stage: &str, message: impl Into<String>) {
        self.push(level, stage, message, None);
    }

    /// Appends an entry with a payload.
    pub fn push(
        &mut self,
        level: DebugLevel,
        stage: &str,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) {
        self.entries.push(DebugEntry {
            timestamp: Utc::now(),
            level,
            stage: stage.to_string(),
            message: message.into(),
            data,
        });
    }

    /// All entries.
    #[must_use]
    pub fn entries(&self) -> &[DebugEntry] {
        &self.entries
    }

    /// Entries at `level`.
    pub fn at_level(&self, level: DebugLevel) -> impl Iterator<Item = &DebugEntry> {
        self.entries.iter().filter(move |e| e.level == level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finalize_force_closes_running_timers() {
        let mut timings = Timings::default();
        timings.start("total");
        timings.start("request");
        timings.stop("request");
        timings.finalize();

        assert!(!timings.is_running("total"));
        assert_eq!(timings.get("request").map(|t| t.forced), Some(false));
        assert_eq!(timings.get("total").map(|t| t.forced), Some(true));
    }

    #[test]
    fn stopping_unknown_timer_is_ignored() {
        let mut timings = Timings::default();
        timings.stop("never-started");
        assert!(timings.finished().is_empty());
    }

    #[test]
    fn debug_log_filters_by_level() {
        let mut log = DebugLog::default();
        log.log(DebugLevel::Info, "pre-request", "ok");
        log.log(DebugLevel::Error, "pre-request", "boom");
        assert_eq!(log.at_level(DebugLevel::Error).count(), 1);
        assert_eq!(log.entries().len(), 2);
    }
}
