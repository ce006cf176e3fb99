//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpSend` port. It sends exactly one
//! request per call: redirects, Digest challenges and signing are handled
//! by the application's transport state machine, so the client is built
//! with `Policy::none()`.

use std::time::{Duration, Instant};

use reqwest::{Client, Method};
use relay_application::ports::{HttpSend, OutgoingRequest, TransportError};
use relay_domain::{Header, Headers, HttpMethod, HttpResponse};
use tracing::debug;

/// Headers the HTTP stack derives itself from the URL and body.
const STACK_MANAGED_HEADERS: [&str; 2] = ["host", "content-length"];

/// HTTP transport backed by `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport that never follows redirects on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wraps a preconfigured client. It must not follow redirects.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
            HttpMethod::Trace => Method::TRACE,
        }
    }

    /// Maps reqwest errors to `TransportError`.
    fn map_error(error: &reqwest::Error, timeout: Option<Duration>) -> TransportError {
        if error.is_timeout() {
            let timeout_ms = timeout.map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
            return TransportError::Timeout { timeout_ms };
        }

        if error.is_connect() {
            let message = error.to_string();
            let lower = message.to_lowercase();
            let host = error
                .url()
                .and_then(|u| u.host_str())
                .unwrap_or("unknown")
                .to_string();
            if lower.contains("dns") || lower.contains("resolve") {
                return TransportError::Dns { host, message };
            }
            if lower.contains("refused") {
                let port = error
                    .url()
                    .and_then(reqwest::Url::port_or_known_default)
                    .unwrap_or(80);
                return TransportError::ConnectionRefused { host, port };
            }
            return TransportError::ConnectionFailed(message);
        }

        TransportError::Other(error.to_string())
    }
}

impl HttpSend for ReqwestTransport {
    async fn send(&self, request: &OutgoingRequest) -> Result<HttpResponse, TransportError> {
        let start = Instant::now();

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), request.url.clone());
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        for header in request.headers.enabled() {
            if STACK_MANAGED_HEADERS.iter().any(|name| header.is_named(name)) {
                continue;
            }
            builder = builder.header(header.name.as_str(), header.value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        debug!(method = %request.method, url = %request.url, "Sending request");
        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(&e, request.timeout))?;

        let status = response.status().as_u16();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            headers.add(Header::new(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(&e, request.timeout))?
            .to_vec();

        Ok(HttpResponse::new(status, headers, body, start.elapsed())
            .with_url(request.url.as_str()))
    }
}
