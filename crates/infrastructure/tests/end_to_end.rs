//! End-to-end runs against a local HTTP server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use pretty_assertions::assert_eq;
use relay_application::ports::{CancellationToken, NoopEvents, RequestEvents};
use relay_application::{CollectionRunner, RequestContext, RunOptions, RunRequest, RunTarget};
use relay_domain::{
    AttemptClassification, Assertion, AuthConfig, Collection, CollectionItem, Header, KeyValue,
    RequestItem, StatusExpectation, VariableScopes,
};
use relay_infrastructure::{MemoryBodyStore, ReqwestTransport, RhaiSandbox, SystemClock};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Engine = RunRequest<ReqwestTransport, RhaiSandbox, MemoryBodyStore>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn engine(bodies: Arc<MemoryBodyStore>) -> Engine {
    init_tracing();
    RunRequest::new(
        Arc::new(ReqwestTransport::new().unwrap()),
        Arc::new(RhaiSandbox::new()),
        bodies,
        Arc::new(SystemClock::new()),
    )
}

async fn run(item: RequestItem, collection: &Collection, scopes: VariableScopes) -> RequestContext {
    engine(Arc::new(MemoryBodyStore::new()))
        .run(
            item,
            collection,
            &[],
            scopes,
            &RunOptions::default(),
            Arc::new(NoopEvents) as Arc<dyn RequestEvents>,
            &CancellationToken::new(),
        )
        .await
}

#[tokio::test]
async fn full_lifecycle_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/7"))
        .and(header("x-token", "abc"))
        .and(header("x-client", "relay"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "Ada"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut collection = Collection::new("api", "/tmp");
    collection.headers.add(Header::new("X-Client", "relay"));

    let mut item = RequestItem::get("user", "{{baseUrl}}/users/7");
    item.scripts.pre_request = r#"req.setHeader("X-Token", bru.getEnvVar("token"));"#.into();
    item.vars.res.push(KeyValue::new("userId", "res.body.id"));
    item.assertions = vec![
        Assertion::StatusCode {
            expected: StatusExpectation::Exact(200),
        },
        Assertion::JsonPath {
            path: "$.name".into(),
            expected: Some("\"Ada\"".into()),
        },
    ];
    item.tests = r#"test("named", || { expect(res.body.name).to.equal("Ada"); });"#.into();
    let uid = item.uid.clone();

    let mut scopes = VariableScopes::new();
    scopes.environment.insert("baseUrl".into(), json!(server.uri()));
    scopes.environment.insert("token".into(), json!("abc"));

    let bodies = Arc::new(MemoryBodyStore::new());
    let ctx = engine(Arc::clone(&bodies))
        .run(
            item,
            &collection,
            &[],
            scopes,
            &RunOptions::default(),
            Arc::new(NoopEvents),
            &CancellationToken::new(),
        )
        .await;

    assert!(ctx.is_ok(), "{:?}", ctx.error);
    assert_eq!(ctx.response.as_ref().map(|r| r.status), Some(200));
    assert_eq!(ctx.scopes.runtime.get("userId"), Some(&json!(7)));
    assert!(ctx.assertion_results.iter().all(|r| r.passed));
    assert_eq!(ctx.test_results.len(), 1);
    assert!(ctx.test_results[0].passed());
    assert_eq!(bodies.get(&uid), Some(br#"{"id":7,"name":"Ada"}"#.to_vec()));
}

#[tokio::test]
async fn digest_challenges_are_answered_once() {
    let server = MockServer::start().await;
    Mock::given(path("/secure"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_string("welcome"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/secure"))
        .respond_with(ResponseTemplate::new(401).insert_header(
            "WWW-Authenticate",
            r#"Digest realm="relay", nonce="abc123", qop="auth", opaque="xyz""#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut item = RequestItem::get("secure", format!("{}/secure", server.uri()));
    item.auth = AuthConfig::digest("mufasa", "circle");

    let ctx = run(item, &Collection::new("api", "/tmp"), VariableScopes::new()).await;

    assert_eq!(ctx.response.as_ref().map(|r| r.status), Some(200));
    let classes: Vec<_> = ctx
        .exchange
        .attempts()
        .iter()
        .map(|a| a.classification)
        .collect();
    assert_eq!(
        classes,
        vec![AttemptClassification::DigestChallenge, AttemptClassification::Final]
    );
    let sent = ctx.exchange.attempts()[1].request.headers.get("authorization").unwrap();
    assert!(sent.starts_with("Digest username=\"mufasa\""), "{sent}");
}

#[tokio::test]
async fn cross_origin_redirects_drop_credentials() {
    let origin = MockServer::start().await;
    let elsewhere = MockServer::start().await;
    Mock::given(path("/start"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{}/land", elsewhere.uri())),
        )
        .mount(&origin)
        .await;
    Mock::given(path("/land"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&elsewhere)
        .await;

    let mut item = RequestItem::get("hop", format!("{}/start", origin.uri()));
    item.auth = AuthConfig::bearer("secret");

    let ctx = run(item, &Collection::new("api", "/tmp"), VariableScopes::new()).await;

    assert_eq!(ctx.response.as_ref().map(|r| r.status), Some(200));
    assert_eq!(ctx.exchange.redirect_count(), 1);
    let landed = elsewhere.received_requests().await.unwrap();
    assert!(landed[0].headers.get("authorization").is_none());
    let first = origin.received_requests().await.unwrap();
    assert!(first[0].headers.get("authorization").is_some());
}

#[tokio::test]
async fn redirect_loops_stop_at_the_cap() {
    let server = MockServer::start().await;
    Mock::given(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
        .expect(3)
        .mount(&server)
        .await;

    let mut item = RequestItem::get("loop", format!("{}/loop", server.uri()));
    item.settings.max_redirects = Some(2);

    let ctx = run(item, &Collection::new("api", "/tmp"), VariableScopes::new()).await;

    let response = ctx.response.as_ref().unwrap();
    assert_eq!(response.status, 302);
    assert!(response.redirect_limit_reached());
    assert!(ctx.is_ok());
}

#[tokio::test]
async fn unreachable_hosts_fail_the_request() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let item = RequestItem::get("down", format!("http://127.0.0.1:{port}/"));

    let ctx = run(item, &Collection::new("api", "/tmp"), VariableScopes::new()).await;

    assert!(ctx.response.is_none());
    assert!(ctx.error.is_some());
}

#[tokio::test]
async fn collection_runs_carry_variables_between_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t-1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Ada"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut login = RequestItem::get("login", format!("{}/login", server.uri()));
    login.method = relay_domain::HttpMethod::Post;
    login.scripts.post_response = r#"bru.setVar("token", res.body.token);"#.into();
    let mut me = RequestItem::get("me", format!("{}/me", server.uri()));
    me.auth = AuthConfig::bearer("{{token}}");

    let mut collection = Collection::new("api", "/tmp");
    collection.items = vec![CollectionItem::Request(login), CollectionItem::Request(me)];

    let runner = CollectionRunner::new(engine(Arc::new(MemoryBodyStore::new())));
    let report = runner
        .run(
            &collection,
            &RunTarget::Collection,
            VariableScopes::new(),
            &RunOptions::default(),
            Arc::new(NoopEvents),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.summary.completed, 2);
    assert_eq!(report.runtime.get("token"), Some(&json!("t-1")));
    assert_eq!(report.results[1].response.as_ref().map(|r| r.status), Some(200));
}
