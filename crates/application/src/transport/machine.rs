//! The redirect / Digest / signing loop.

use std::sync::Arc;

use relay_domain::{
    AttemptClassification, AttemptRecord, AttemptRequest, DigestChallenge, HttpExchange,
    HttpMethod, HttpResponse, REDIRECT_LIMIT_REACHED, Timeline, TimelineEntry,
    auth::is_digest_challenge,
};
use tracing::{debug, info};
use url::Url;

use super::digest::{authorization_header, generate_cnonce};
use super::request::{TransportAuth, TransportRequest};
use super::signing::sign_request;
use crate::error::LifecycleError;
use crate::ports::{CancellationToken, Clock, HttpSend, ResponseBodyStore, TransportError};

const REDIRECT_STATUSES: [u16; 6] = [300, 301, 302, 303, 307, 308];

/// What to do after classifying a response.
enum Next {
    Redirect(Url),
    Digest(DigestChallenge),
    Final,
}

/// Drives one request through `Prepare → Send → Classify` until a final response.
pub struct TransportMachine<H: HttpSend, B: ResponseBodyStore> {
    http: Arc<H>,
    bodies: Arc<B>,
    clock: Arc<dyn Clock>,
}

impl<H: HttpSend, B: ResponseBodyStore> TransportMachine<H, B> {
    /// Creates a machine over the given ports.
    #[must_use]
    pub fn new(http: Arc<H>, bodies: Arc<B>, clock: Arc<dyn Clock>) -> Self {
        Self {
            http,
            bodies,
            clock,
        }
    }

    /// Runs the exchange, appending every attempt to `exchange` and `timeline`.
    ///
    /// `on_send` sees each attempt just before it goes on the wire.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::Transport` when an attempt gets no response
    /// (including cancellation) and `LifecycleError::BodyStore` when the final
    /// body cannot be persisted.
    pub async fn execute(
        &self,
        mut request: TransportRequest,
        exchange: &mut HttpExchange,
        timeline: &mut Timeline,
        cancel: &CancellationToken,
        mut on_send: impl FnMut(&AttemptRequest) + Send,
    ) -> Result<HttpResponse, LifecycleError> {
        let mut followed: u32 = 0;
        let mut authorization_sent = false;

        loop {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled.into());
            }

            let outgoing = self.prepare(&request)?;
            let snapshot = TransportRequest::snapshot(&outgoing);
            on_send(&snapshot);
            let sent_at = self.clock.now();

            debug!(
                method = %outgoing.method,
                url = %outgoing.url,
                attempt = exchange.len() + 1,
                "Sending request"
            );
            let mut response = tokio::select! {
                result = self.http.send(&outgoing) => result?,
                () = cancel.cancelled() => return Err(TransportError::Cancelled.into()),
            };
            response.url = outgoing.url.to_string();
            authorization_sent |= outgoing.headers.contains("authorization");

            let next = classify(&request, authorization_sent, &mut response, followed);
            let classification = match &next {
                Next::Redirect(_) => AttemptClassification::Redirect,
                Next::Digest(_) => AttemptClassification::DigestChallenge,
                Next::Final => AttemptClassification::Final,
            };

            if matches!(next, Next::Final) {
                response.body_location = Some(self.bodies.persist(&request.uid, &response.body).await?);
            }

            record(exchange, timeline, sent_at, snapshot, response.clone(), classification);

            match next {
                Next::Final => {
                    info!(
                        status = response.status,
                        attempts = exchange.len(),
                        "Exchange complete"
                    );
                    return Ok(response);
                }
                Next::Redirect(location) => {
                    followed += 1;
                    follow_redirect(&mut request, response.status, location);
                }
                Next::Digest(challenge) => {
                    if let TransportAuth::Digest { username, password } = &request.auth {
                        let uri = request_uri(&request.url);
                        let header = authorization_header(
                            &challenge,
                            username,
                            password,
                            request.method,
                            &uri,
                            &generate_cnonce(),
                        );
                        debug!(realm = %challenge.realm, "Answering Digest challenge");
                        request.headers.set("authorization", header);
                    }
                }
            }
        }
    }

    /// Attaches `host`, `content-length` and, for SigV4, a fresh signature.
    fn prepare(
        &self,
        request: &TransportRequest,
    ) -> Result<crate::ports::OutgoingRequest, TransportError> {
        let mut headers = request.prepared_headers();
        if let TransportAuth::AwsV4(credentials) = &request.auth {
            sign_request(
                request.method,
                &request.url,
                &mut headers,
                request.body.as_deref().unwrap_or_default(),
                credentials,
                self.clock.now(),
            )?;
        }
        Ok(request.outgoing(headers))
    }
}

/// `authorization_sent` covers every attempt of the exchange so far.
fn classify(
    request: &TransportRequest,
    authorization_sent: bool,
    response: &mut HttpResponse,
    followed: u32,
) -> Next {
    if REDIRECT_STATUSES.contains(&response.status) {
        if let Some(location) = response.header("location") {
            if request.max_redirects == 0 {
                return Next::Final;
            }
            if followed >= request.max_redirects {
                debug!(max_redirects = request.max_redirects, "Redirect limit reached");
                response.annotations.push(REDIRECT_LIMIT_REACHED.to_string());
                return Next::Final;
            }
            if let Ok(target) = request.url.join(location) {
                return Next::Redirect(target);
            }
        }
        return Next::Final;
    }

    if response.status == 401
        && matches!(request.auth, TransportAuth::Digest { .. })
        && !authorization_sent
    {
        let challenge = response
            .headers
            .get_all("www-authenticate")
            .into_iter()
            .filter(|value| is_digest_challenge(value))
            .find_map(|value| DigestChallenge::parse(value).ok());
        if let Some(challenge) = challenge {
            return Next::Digest(challenge);
        }
    }

    Next::Final
}

fn follow_redirect(request: &mut TransportRequest, status: u16, target: Url) {
    if !request.same_origin(&target) {
        request.headers.remove("authorization");
    }
    let switch_to_get = status == 303
        || (matches!(status, 301 | 302) && request.method.downgrades_on_redirect());
    if switch_to_get && request.method != HttpMethod::Head {
        request.method = HttpMethod::Get;
        request.body = None;
        request.headers.remove("content-type");
    }
    debug!(status, location = %target, "Following redirect");
    request.url = target;
}

fn record(
    exchange: &mut HttpExchange,
    timeline: &mut Timeline,
    sent_at: chrono::DateTime<chrono::Utc>,
    request: AttemptRequest,
    response: HttpResponse,
    classification: AttemptClassification,
) {
    let record = AttemptRecord {
        sent_at,
        request,
        response,
        classification,
    };
    timeline.push(TimelineEntry::from(&record));
    exchange.push(record);
}

/// Path plus query, as used in the Digest `uri` field.
fn request_uri(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ports::{BodyStoreError, FixedClock, OutgoingRequest};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use relay_domain::{BodyLocation, Headers};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replies with a scripted response per call and records what it was sent.
    struct ScriptedSend {
        reply: Box<dyn Fn(usize, &OutgoingRequest) -> HttpResponse + Send + Sync>,
        sent: Mutex<Vec<OutgoingRequest>>,
    }

    impl ScriptedSend {
        fn new(
            reply: impl Fn(usize, &OutgoingRequest) -> HttpResponse + Send + Sync + 'static,
        ) -> Self {
            Self {
                reply: Box::new(reply),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<OutgoingRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl HttpSend for ScriptedSend {
        async fn send(&self, request: &OutgoingRequest) -> Result<HttpResponse, TransportError> {
            let index = {
                let mut sent = self.sent.lock().unwrap();
                sent.push(request.clone());
                sent.len() - 1
            };
            Ok((self.reply)(index, request))
        }
    }

    struct MemoryBodies;

    impl ResponseBodyStore for MemoryBodies {
        async fn persist(&self, uid: &str, _body: &[u8]) -> Result<BodyLocation, BodyStoreError> {
            Ok(BodyLocation::Memory {
                key: uid.to_string(),
            })
        }
    }

    fn response(status: u16, headers: &[(&str, &str)]) -> HttpResponse {
        let headers: Headers = headers.iter().map(|(n, v)| (*n, *v)).collect();
        HttpResponse::new(status, headers, b"body".to_vec(), Duration::from_millis(5))
    }

    fn machine(send: Arc<ScriptedSend>) -> TransportMachine<ScriptedSend, MemoryBodies> {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        TransportMachine::new(send, Arc::new(MemoryBodies), Arc::new(clock))
    }

    fn request(method: HttpMethod, url: &str, auth: TransportAuth) -> TransportRequest {
        TransportRequest {
            uid: "req-1".into(),
            method,
            url: Url::parse(url).unwrap(),
            headers: Headers::new(),
            body: None,
            timeout: None,
            max_redirects: 25,
            auth,
        }
    }

    async fn run(
        send: &Arc<ScriptedSend>,
        request: TransportRequest,
    ) -> (Result<HttpResponse, LifecycleError>, HttpExchange, Timeline) {
        let mut exchange = HttpExchange::new();
        let mut timeline = Timeline::default();
        let result = machine(Arc::clone(send))
            .execute(
                request,
                &mut exchange,
                &mut timeline,
                &CancellationToken::new(),
                |_| {},
            )
            .await;
        (result, exchange, timeline)
    }

    #[tokio::test]
    async fn follows_302_to_the_resolved_location() {
        let send = Arc::new(ScriptedSend::new(|i, _| match i {
            0 => response(302, &[("Location", "/next?x=1")]),
            _ => response(200, &[]),
        }));

        let (result, exchange, timeline) = run(
            &send,
            request(HttpMethod::Get, "http://api.test/start", TransportAuth::None),
        )
        .await;

        let final_response = result.unwrap();
        assert_eq!(final_response.status, 200);
        assert_eq!(final_response.url, "http://api.test/next?x=1");
        assert_eq!(
            final_response.body_location,
            Some(BodyLocation::Memory {
                key: "req-1".into()
            })
        );

        let sent = send.sent();
        assert_eq!(sent[1].url.host_str(), Some("api.test"));
        assert_eq!(sent[1].url.path(), "/next");
        assert_eq!(sent[1].headers.get("host"), Some("api.test"));
        assert_eq!(exchange.redirect_count(), 1);
        assert_eq!(timeline.entries().len(), 2);
    }

    #[tokio::test]
    async fn stops_after_the_redirect_cap_with_annotation() {
        let send = Arc::new(ScriptedSend::new(|i, _| {
            let location = format!("/hop/{}", i + 1);
            response(302, &[("Location", location.as_str())])
        }));

        let (result, exchange, _) = run(
            &send,
            request(HttpMethod::Get, "http://loop.test/", TransportAuth::None),
        )
        .await;

        let final_response = result.unwrap();
        assert_eq!(send.sent().len(), 26);
        assert_eq!(exchange.redirect_count(), 25);
        assert_eq!(final_response.status, 302);
        assert!(final_response.redirect_limit_reached());
        assert_eq!(
            exchange.final_attempt().map(|a| a.classification),
            Some(AttemptClassification::Final)
        );
    }

    #[tokio::test]
    async fn zero_cap_disables_following_without_annotation() {
        let send = Arc::new(ScriptedSend::new(|_, _| {
            response(301, &[("Location", "http://other.test/")])
        }));
        let mut req = request(HttpMethod::Get, "http://a.test/", TransportAuth::None);
        req.max_redirects = 0;

        let (result, _, _) = run(&send, req).await;

        let final_response = result.unwrap();
        assert_eq!(send.sent().len(), 1);
        assert!(!final_response.redirect_limit_reached());
    }

    #[tokio::test]
    async fn see_other_switches_to_get_and_drops_body() {
        let send = Arc::new(ScriptedSend::new(|i, _| match i {
            0 => response(303, &[("Location", "/result")]),
            _ => response(200, &[]),
        }));
        let mut req = request(HttpMethod::Post, "http://a.test/submit", TransportAuth::None);
        req.body = Some(b"payload".to_vec());
        req.headers.set("content-type", "text/plain");

        let (result, _, _) = run(&send, req).await;
        assert!(result.is_ok());

        let sent = send.sent();
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].headers.get("content-length"), Some("7"));
        assert_eq!(sent[1].method, HttpMethod::Get);
        assert_eq!(sent[1].body, None);
        assert!(!sent[1].headers.contains("content-length"));
        assert!(!sent[1].headers.contains("content-type"));
    }

    #[tokio::test]
    async fn temporary_redirect_keeps_method_and_body() {
        let send = Arc::new(ScriptedSend::new(|i, _| match i {
            0 => response(307, &[("Location", "/again")]),
            _ => response(200, &[]),
        }));
        let mut req = request(HttpMethod::Post, "http://a.test/submit", TransportAuth::None);
        req.body = Some(b"payload".to_vec());

        let _ = run(&send, req).await;

        let sent = send.sent();
        assert_eq!(sent[1].method, HttpMethod::Post);
        assert_eq!(sent[1].body.as_deref(), Some(b"payload".as_slice()));
    }

    #[tokio::test]
    async fn cross_origin_redirect_drops_authorization() {
        let send = Arc::new(ScriptedSend::new(|i, _| match i {
            0 => response(302, &[("Location", "http://elsewhere.test/")]),
            _ => response(200, &[]),
        }));
        let mut req = request(HttpMethod::Get, "http://a.test/", TransportAuth::None);
        req.headers.set("Authorization", "Bearer secret");

        let _ = run(&send, req).await;

        let sent = send.sent();
        assert_eq!(sent[0].headers.get("authorization"), Some("Bearer secret"));
        assert!(!sent[1].headers.contains("authorization"));
    }

    #[tokio::test]
    async fn digest_challenge_is_answered_exactly_once() {
        let send = Arc::new(ScriptedSend::new(|_, _| {
            response(
                401,
                &[(
                    "WWW-Authenticate",
                    r#"Digest realm="x", nonce="y", algorithm=MD5"#,
                )],
            )
        }));

        let (result, exchange, _) = run(
            &send,
            request(
                HttpMethod::Get,
                "http://secure.test/private?id=1",
                TransportAuth::Digest {
                    username: "alice".into(),
                    password: "secret".into(),
                },
            ),
        )
        .await;

        assert_eq!(result.unwrap().status, 401);
        let sent = send.sent();
        assert_eq!(sent.len(), 2);
        assert!(!sent[0].headers.contains("authorization"));

        let auth = sent[1].headers.get("authorization").unwrap();
        assert!(auth.starts_with("Digest "));
        assert!(auth.contains("username=\"alice\""));
        assert!(auth.contains("realm=\"x\""));
        assert!(auth.contains("nonce=\"y\""));
        assert!(auth.contains("uri=\"/private?id=1\""));
        assert!(auth.contains("nc=\"00000001\""));
        assert!(auth.contains("cnonce=\""));
        assert_eq!(exchange.count(AttemptClassification::DigestChallenge), 1);
    }

    #[tokio::test]
    async fn digest_is_not_answered_again_after_a_cross_origin_redirect() {
        let challenge = r#"Digest realm="x", nonce="y", qop="auth""#;
        let send = Arc::new(ScriptedSend::new(move |i, _| match i {
            0 | 2 => response(401, &[("WWW-Authenticate", challenge)]),
            1 => response(302, &[("Location", "http://other.test/p")]),
            _ => response(200, &[]),
        }));

        let (result, exchange, _) = run(
            &send,
            request(
                HttpMethod::Get,
                "http://secure.test/",
                TransportAuth::Digest {
                    username: "alice".into(),
                    password: "secret".into(),
                },
            ),
        )
        .await;

        assert_eq!(result.unwrap().status, 401);
        let sent = send.sent();
        assert_eq!(sent.len(), 3);
        let with_auth = sent
            .iter()
            .filter(|r| r.headers.contains("authorization"))
            .count();
        assert_eq!(with_auth, 1);
        assert_eq!(sent[2].url.host_str(), Some("other.test"));
        assert_eq!(exchange.count(AttemptClassification::DigestChallenge), 1);
    }

    #[tokio::test]
    async fn digest_is_ignored_without_digest_auth() {
        let send = Arc::new(ScriptedSend::new(|_, _| {
            response(401, &[("WWW-Authenticate", r#"Digest realm="x", nonce="y""#)])
        }));

        let (result, _, _) = run(
            &send,
            request(HttpMethod::Get, "http://secure.test/", TransportAuth::None),
        )
        .await;

        assert_eq!(result.unwrap().status, 401);
        assert_eq!(send.sent().len(), 1);
    }

    #[tokio::test]
    async fn aws_signature_is_recomputed_for_each_send() {
        let send = Arc::new(ScriptedSend::new(|i, _| match i {
            0 => response(302, &[("Location", "/moved")]),
            _ => response(200, &[]),
        }));
        let creds = super::super::request::AwsCredentials {
            access_key_id: "AKID".into(),
            secret_access_key: "SECRET".into(),
            session_token: None,
            service: "execute-api".into(),
            region: "eu-west-1".into(),
        };

        let _ = run(
            &send,
            request(HttpMethod::Get, "https://api.test/orig", TransportAuth::AwsV4(creds)),
        )
        .await;

        let sent = send.sent();
        let first = sent[0].headers.get("authorization").unwrap().to_string();
        let second = sent[1].headers.get("authorization").unwrap().to_string();
        assert!(first.starts_with("AWS4-HMAC-SHA256 Credential=AKID/20240101/eu-west-1/execute-api/aws4_request"));
        assert_ne!(first, second);
        assert_eq!(sent[1].headers.get("x-amz-date"), Some("20240101T000000Z"));
    }

    #[tokio::test]
    async fn cancelled_token_prevents_sending() {
        let send = Arc::new(ScriptedSend::new(|_, _| response(200, &[])));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut exchange = HttpExchange::new();
        let mut timeline = Timeline::default();

        let result = machine(Arc::clone(&send))
            .execute(
                request(HttpMethod::Get, "http://a.test/", TransportAuth::None),
                &mut exchange,
                &mut timeline,
                &cancel,
                |_| {},
            )
            .await;

        assert!(result.unwrap_err().is_cancelled());
        assert!(send.sent().is_empty());
        assert!(exchange.is_empty());
    }

    #[tokio::test]
    async fn on_send_sees_every_attempt() {
        let send = Arc::new(ScriptedSend::new(|i, _| match i {
            0 => response(301, &[("Location", "/b")]),
            _ => response(204, &[]),
        }));
        let mut seen = Vec::new();
        let mut exchange = HttpExchange::new();
        let mut timeline = Timeline::default();

        machine(Arc::clone(&send))
            .execute(
                request(HttpMethod::Get, "http://a.test/a", TransportAuth::None),
                &mut exchange,
                &mut timeline,
                &CancellationToken::new(),
                |attempt| seen.push(attempt.url.clone()),
            )
            .await
            .expect("exchange should complete");

        assert_eq!(seen, vec!["http://a.test/a".to_string(), "http://a.test/b".to_string()]);
    }
}
