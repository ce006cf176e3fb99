//! HTTP response as produced by the transport.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::request::Headers;

/// Annotation attached when the redirect cap stopped the exchange.
pub const REDIRECT_LIMIT_REACHED: &str = "redirect limit reached";

/// Canonical reason phrase for common status codes.
#[must_use]
pub const fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}

/// Where a persisted response body was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BodyLocation {
    /// A file on disk.
    File {
        /// Absolute path of the file.
        path: String,
    },
    /// Kept in memory under the request uid.
    Memory {
        /// Request uid.
        key: String,
    },
}

/// A response received for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase.
    pub status_text: String,
    /// Headers in arrival order.
    pub headers: Headers,
    /// Raw body bytes; persisted separately.
    #[serde(skip)]
    pub body: Vec<u8>,
    /// Time from send to full body.
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    /// URL that produced this response.
    pub url: String,
    /// Where the body was persisted, once final.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_location: Option<BodyLocation>,
    /// Informational annotations, e.g. `redirect limit reached`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
}

impl HttpResponse {
    /// Creates a response with the canonical reason phrase.
    #[must_use]
    pub fn new(status: u16, headers: Headers, body: Vec<u8>, duration: Duration) -> Self {
        Self {
            status,
            status_text: reason_phrase(status).to_string(),
            headers,
            body,
            duration,
            url: String::new(),
            body_location: None,
            annotations: Vec::new(),
        }
    }

    /// Sets the URL (builder pattern).
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Returns a header value (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// The `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Duration in whole milliseconds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn duration_millis(&self) -> u64 {
        self.duration.as_millis() as u64
    }

    /// Whether the redirect cap stopped the exchange at this response.
    #[must_use]
    pub fn redirect_limit_reached(&self) -> bool {
        self.annotations.iter().any(|a| a == REDIRECT_LIMIT_REACHED)
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_fills_reason_phrase() {
        let response = HttpResponse::new(404, Headers::new(), Vec::new(), Duration::ZERO);
        assert_eq!(response.status_text, "Not Found");
        assert!(!response.is_success());
    }

    #[test]
    fn body_text_is_lossy() {
        let response = HttpResponse::new(200, Headers::new(), vec![b'o', b'k', 0xff], Duration::ZERO);
        assert_eq!(response.body_text(), "ok\u{fffd}");
    }

    #[test]
    fn redirect_annotation_is_detected() {
        let mut response = HttpResponse::new(302, Headers::new(), Vec::new(), Duration::ZERO);
        assert!(!response.redirect_limit_reached());
        response.annotations.push(REDIRECT_LIMIT_REACHED.to_string());
        assert!(response.redirect_limit_reached());
    }
}
