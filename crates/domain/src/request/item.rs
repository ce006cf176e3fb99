//! The request item: everything a stored request declares.

use serde::{Deserialize, Serialize};

use super::{Headers, HttpMethod, KeyValue, QueryParam, RequestBody};
use crate::auth::AuthConfig;
use crate::id::generate_id;
use crate::testing::Assertion;

/// User scripts attached to a request, folder or collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestScripts {
    /// Runs before interpolation; may mutate the request through `req`.
    #[serde(default)]
    pub pre_request: String,
    /// Runs after the response arrives.
    #[serde(default)]
    pub post_response: String,
}

/// Request variables: `req` are interpolated before the pre-request script,
/// `res` are evaluated as expressions against the response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestVars {
    /// Pre-request variables.
    #[serde(default)]
    pub req: Vec<KeyValue>,
    /// Post-response variables.
    #[serde(default)]
    pub res: Vec<KeyValue>,
}

/// Per-request transport settings. `None` falls back to the engine settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSettings {
    /// Request timeout in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Maximum number of redirects to follow; `0` disables following.
    #[serde(default)]
    pub max_redirects: Option<u32>,
}

/// A stored request definition as handed over by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestItem {
    /// Stable identifier; also keys the persisted response body.
    #[serde(default = "generate_id")]
    pub uid: String,
    /// Display name, the target of `setNextRequest`.
    pub name: String,
    /// HTTP method.
    #[serde(default)]
    pub method: HttpMethod,
    /// URL template.
    pub url: String,
    /// Query parameters appended to the URL.
    #[serde(default)]
    pub params: Vec<QueryParam>,
    /// Request headers.
    #[serde(default)]
    pub headers: Headers,
    /// Body by mode.
    #[serde(default)]
    pub body: RequestBody,
    /// Authentication; `Inherit` by default.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Pre-request and post-response scripts.
    #[serde(default)]
    pub scripts: RequestScripts,
    /// Request variables.
    #[serde(default)]
    pub vars: RequestVars,
    /// Declarative assertions.
    #[serde(default)]
    pub assertions: Vec<Assertion>,
    /// Test script run after the post-response script.
    #[serde(default)]
    pub tests: String,
    /// Transport settings.
    #[serde(default)]
    pub settings: RequestSettings,
}

impl RequestItem {
    /// Creates a request with the given name, method and URL.
    #[must_use]
    pub fn new(name: impl Into<String>, method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            uid: generate_id(),
            name: name.into(),
            method,
            url: url.into(),
            params: Vec::new(),
            headers: Headers::new(),
            body: RequestBody::None,
            auth: AuthConfig::Inherit,
            scripts: RequestScripts::default(),
            vars: RequestVars::default(),
            assertions: Vec::new(),
            tests: String::new(),
            settings: RequestSettings::default(),
        }
    }

    /// Shorthand for a GET request.
    #[must_use]
    pub fn get(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Get, url)
    }
}
