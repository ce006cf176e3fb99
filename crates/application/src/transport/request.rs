//! The request handed to the state machine.

use std::time::Duration;

use relay_domain::{AttemptRequest, Headers, HttpMethod};
use url::Url;

use crate::ports::OutgoingRequest;

/// AWS credentials and credential scope inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Session token, sent as `x-amz-security-token`.
    pub session_token: Option<String>,
    /// Service name.
    pub service: String,
    /// Region.
    pub region: String,
}

/// Auth negotiated by the state machine rather than baked into headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransportAuth {
    /// Nothing to negotiate.
    #[default]
    None,
    /// Answer one Digest challenge.
    Digest {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// Sign every send with SigV4.
    AwsV4(AwsCredentials),
}

/// A fully interpolated request ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// Request uid, used to key the persisted body.
    pub uid: String,
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: Url,
    /// Headers, `Content-Type` already defaulted.
    pub headers: Headers,
    /// Encoded body.
    pub body: Option<Vec<u8>>,
    /// Per-attempt timeout.
    pub timeout: Option<Duration>,
    /// Redirect cap; 0 disables following.
    pub max_redirects: u32,
    /// Auth handled during the exchange.
    pub auth: TransportAuth,
}

impl TransportRequest {
    /// The host header value: host, plus the port when it is not the scheme default.
    #[must_use]
    pub fn host_header(&self) -> Option<String> {
        let host = self.url.host_str()?;
        Some(match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }

    /// Attaches `host` and `content-length`.
    #[must_use]
    pub fn prepared_headers(&self) -> Headers {
        let mut headers = self.headers.clone();
        if let Some(host) = self.host_header() {
            headers.set("host", host);
        }
        match &self.body {
            Some(body) => headers.set("content-length", body.len().to_string()),
            None => {
                headers.remove("content-length");
            }
        }
        headers
    }

    /// The wire request for the given prepared headers.
    #[must_use]
    pub fn outgoing(&self, headers: Headers) -> OutgoingRequest {
        OutgoingRequest {
            method: self.method,
            url: self.url.clone(),
            headers,
            body: self.body.clone(),
            timeout: self.timeout,
        }
    }

    /// Snapshot recorded in the exchange.
    #[must_use]
    pub fn snapshot(outgoing: &OutgoingRequest) -> AttemptRequest {
        AttemptRequest {
            method: outgoing.method,
            url: outgoing.url.to_string(),
            headers: outgoing.headers.clone(),
            body_size: outgoing.body.as_ref().map_or(0, Vec::len),
        }
    }

    /// Whether `other` shares scheme, host and port with the current URL.
    #[must_use]
    pub fn same_origin(&self, other: &Url) -> bool {
        self.url.origin() == other.origin()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(url: &str, body: Option<&str>) -> TransportRequest {
        TransportRequest {
            uid: "uid".into(),
            method: HttpMethod::Post,
            url: Url::parse(url).unwrap(),
            headers: Headers::new(),
            body: body.map(|b| b.as_bytes().to_vec()),
            timeout: None,
            max_redirects: 25,
            auth: TransportAuth::None,
        }
    }

    #[test]
    fn host_includes_non_default_port() {
        assert_eq!(
            request("http://localhost:8080/a", None).host_header().as_deref(),
            Some("localhost:8080")
        );
        assert_eq!(
            request("https://example.com/a", None).host_header().as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn content_length_only_with_body() {
        let with_body = request("http://h/", Some("abc")).prepared_headers();
        assert_eq!(with_body.get("content-length"), Some("3"));
        assert_eq!(with_body.get("host"), Some("h"));

        let without = request("http://h/", None).prepared_headers();
        assert!(!without.contains("content-length"));
    }

    #[test]
    fn origin_comparison_considers_port() {
        let req = request("http://h:1/", None);
        assert!(req.same_origin(&Url::parse("http://h:1/other").unwrap()));
        assert!(!req.same_origin(&Url::parse("http://h:2/").unwrap()));
    }
}
