//! HTTP send port and cancellation

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use relay_domain::{Headers, HttpMethod, HttpResponse};
use thiserror::Error;
use tokio::sync::watch;
use url::Url;

/// A fully prepared request, exactly as it goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: Url,
    /// Headers, including `host` and `content-length`.
    pub headers: Headers,
    /// Encoded body.
    pub body: Option<Vec<u8>>,
    /// Per-attempt timeout.
    pub timeout: Option<Duration>,
}

/// Errors raised when no response could be obtained.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request timed out.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// The server refused the connection.
    #[error("connection refused by {host}:{port}")]
    ConnectionRefused {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
    },

    /// The host name could not be resolved.
    #[error("could not resolve host '{host}': {message}")]
    Dns {
        /// Target host.
        host: String,
        /// Resolver message.
        message: String,
    },

    /// Any other connection failure.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The URL could not be parsed or has no host.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The body could not be encoded.
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// Request signing failed.
    #[error("request signing failed: {0}")]
    Signing(String),

    /// The abort token fired.
    #[error("request cancelled")]
    Cancelled,

    /// The exchange finished without any response.
    #[error("server did not return a response")]
    NoResponse,

    /// Anything else reported by the HTTP stack.
    #[error("{0}")]
    Other(String),
}

/// Port for sending one HTTP request without following redirects.
///
/// Redirects, Digest challenges and signing are driven by the transport
/// state machine; implementations must return 3xx and 401 responses as-is.
pub trait HttpSend: Send + Sync {
    /// Sends `request` and reads the full response body.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` when no response was obtained.
    fn send(
        &self,
        request: &OutgoingRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// Abort signal shared between the caller and a running request.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Creates a token that has not fired.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Fires the token. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Whether the token has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Completes once the token fires.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this only returns once fired.
        let _ = receiver.wait_for(|fired| *fired).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
