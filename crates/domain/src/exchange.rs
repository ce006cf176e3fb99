//! The chain of attempts one request produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::request::{Headers, HttpMethod};
use crate::response::HttpResponse;

/// Why the state machine left an attempt behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptClassification {
    /// A 3xx with `Location` that was followed.
    Redirect,
    /// A 401 Digest challenge that was answered.
    DigestChallenge,
    /// The response returned to the caller.
    Final,
}

/// The request half of an attempt, as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRequest {
    /// Method sent.
    pub method: HttpMethod,
    /// Absolute URL sent.
    pub url: String,
    /// Headers sent, including the prepared `host` and `content-length`.
    pub headers: Headers,
    /// Body size in bytes.
    pub body_size: usize,
}

/// One send/receive round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    /// When the attempt was sent.
    pub sent_at: DateTime<Utc>,
    /// The request as sent.
    pub request: AttemptRequest,
    /// The response received.
    pub response: HttpResponse,
    /// How the state machine classified it.
    pub classification: AttemptClassification,
}

/// Ordered, append-only chain of attempts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HttpExchange {
    attempts: Vec<AttemptRecord>,
}

impl HttpExchange {
    /// Creates an empty exchange.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attempts: Vec::new(),
        }
    }

    /// Appends an attempt.
    pub fn push(&mut self, record: AttemptRecord) {
        self.attempts.push(record);
    }

    /// All attempts in order.
    #[must_use]
    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    /// The final attempt, if the exchange completed.
    #[must_use]
    pub fn final_attempt(&self) -> Option<&AttemptRecord> {
        self.attempts
            .last()
            .filter(|a| a.classification == AttemptClassification::Final)
    }

    /// Number of followed redirects.
    #[must_use]
    pub fn redirect_count(&self) -> usize {
        self.count(AttemptClassification::Redirect)
    }

    /// Number of attempts with the given classification.
    #[must_use]
    pub fn count(&self, classification: AttemptClassification) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.classification == classification)
            .count()
    }

    /// Number of attempts.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    /// Returns true when nothing was sent.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}
