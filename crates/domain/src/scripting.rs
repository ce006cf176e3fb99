//! Script phases and the data crossing the sandbox boundary.

use serde::{Deserialize, Serialize};

use crate::environment::VariableMap;
use crate::id::generate_id;
use crate::request::{Headers, HttpMethod, RequestBody, RequestItem};
use crate::response::HttpResponse;

/// The pipeline stage a script runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptPhase {
    /// Before interpolation; the request is writable.
    PreRequest,
    /// After the response arrives.
    PostResponse,
    /// The test script.
    Tests,
}

impl ScriptPhase {
    /// Whether `test`, `expect` and `assert` are exposed.
    #[must_use]
    pub const fn is_test_capable(self) -> bool {
        matches!(self, Self::PostResponse | Self::Tests)
    }

    /// Whether `req` rejects writes.
    #[must_use]
    pub const fn request_is_read_only(self) -> bool {
        !matches!(self, Self::PreRequest)
    }

    /// Stage label used in logs and timings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PreRequest => "pre-request",
            Self::PostResponse => "post-response",
            Self::Tests => "tests",
        }
    }
}

/// The request as scripts see and mutate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// URL (may still contain placeholders in the pre-request phase).
    pub url: String,
    /// Headers in insertion order.
    pub headers: Headers,
    /// Body by mode.
    pub body: RequestBody,
    /// Timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Redirect cap.
    pub max_redirects: Option<u32>,
    /// Auth mode name, read-only.
    pub auth_mode: String,
}

impl ScriptRequest {
    /// Snapshot of a request item.
    #[must_use]
    pub fn from_item(item: &RequestItem) -> Self {
        Self {
            method: item.method,
            url: item.url.clone(),
            headers: item.headers.clone(),
            body: item.body.clone(),
            timeout_ms: item.settings.timeout_ms,
            max_redirects: item.settings.max_redirects,
            auth_mode: item.auth.mode().to_string(),
        }
    }

    /// Writes the script-mutable fields back into `item`.
    pub fn apply_to(&self, item: &mut RequestItem) {
        item.method = self.method;
        item.url.clone_from(&self.url);
        item.headers = self.headers.clone();
        item.body = self.body.clone();
        item.settings.timeout_ms = self.timeout_ms;
        item.settings.max_redirects = self.max_redirects;
    }
}

/// The final response as scripts see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptResponse {
    /// Status code.
    pub status: u16,
    /// Reason phrase.
    pub status_text: String,
    /// Headers in arrival order.
    pub headers: Headers,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    /// Total response time in milliseconds.
    pub response_time_ms: u64,
    /// URL of the final attempt.
    pub url: String,
}

impl ScriptResponse {
    /// Snapshot of a transport response.
    #[must_use]
    pub fn from_response(response: &HttpResponse) -> Self {
        Self {
            status: response.status,
            status_text: response.status_text.clone(),
            headers: response.headers.clone(),
            body: response.body_text(),
            response_time_ms: response.duration_millis(),
            url: response.url.clone(),
        }
    }
}

/// Outcome of a single `test()` block or `addResult` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// The block completed.
    Pass,
    /// The block raised.
    Fail,
}

/// A recorded test outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Generated unique id.
    pub uid: String,
    /// Name given to `test()`.
    pub description: String,
    /// Pass or fail.
    pub status: TestStatus,
    /// Failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Observed value of a failed expectation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<serde_json::Value>,
    /// Expected value of a failed expectation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<serde_json::Value>,
}

impl TestResult {
    /// A passing result.
    #[must_use]
    pub fn pass(description: impl Into<String>) -> Self {
        Self {
            uid: generate_id(),
            description: description.into(),
            status: TestStatus::Pass,
            error: None,
            actual: None,
            expected: None,
        }
    }

    /// A failing result.
    #[must_use]
    pub fn fail(description: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Fail,
            error: Some(error.into()),
            ..Self::pass(description)
        }
    }

    /// Attaches actual/expected values (builder pattern).
    #[must_use]
    pub fn with_values(
        mut self,
        actual: Option<serde_json::Value>,
        expected: Option<serde_json::Value>,
    ) -> Self {
        self.actual = actual;
        self.expected = expected;
        self
    }

    /// Whether the test passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == TestStatus::Pass
    }
}

/// Severity of a console entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    /// `console.log` / `print`.
    Log,
    /// `console.info`.
    Info,
    /// `console.warn`.
    Warn,
    /// `console.error`.
    Error,
    /// `console.debug` / `debug`.
    Debug,
}

/// One line written by a script to its console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    /// Severity.
    pub level: ConsoleLevel,
    /// Rendered arguments.
    pub args: Vec<String>,
}

impl ConsoleEntry {
    /// Creates an entry.
    #[must_use]
    pub const fn new(level: ConsoleLevel, args: Vec<String>) -> Self {
        Self { level, args }
    }

    /// Arguments joined by a space.
    #[must_use]
    pub fn message(&self) -> String {
        self.args.join(" ")
    }
}

/// What a script run hands back to the pipeline. Replaces the context's bags wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptExecutionResult {
    /// Environment variables after the run.
    pub env_variables: VariableMap,
    /// Runtime variables after the run.
    pub runtime_variables: VariableMap,
    /// Name of the request to jump to in a collection run.
    pub next_request_name: Option<String>,
    /// Set by `bru.skipRequest()`.
    pub skip_request: bool,
    /// Results recorded by `test()`.
    pub tests: Vec<TestResult>,
    /// The request facade's final state.
    pub request: ScriptRequest,
    /// Console output, in order.
    pub console: Vec<ConsoleEntry>,
}

impl ScriptExecutionResult {
    /// A result that changes nothing: the bags and request are returned as given.
    #[must_use]
    pub const fn unchanged(
        env_variables: VariableMap,
        runtime_variables: VariableMap,
        request: ScriptRequest,
    ) -> Self {
        Self {
            env_variables,
            runtime_variables,
            next_request_name: None,
            skip_request: false,
            tests: Vec::new(),
            request,
            console: Vec::new(),
        }
    }
}
