//! Relay Domain - Core request execution types
//!
//! This crate defines the data model of the request execution core:
//! request items, variable groups, script boundary records, responses,
//! exchanges and diagnostics. Everything here is pure Rust with no I/O
//! beyond `ProcessEnvironment::capture`.

pub mod auth;
pub mod collection;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod exchange;
pub mod id;
pub mod request;
pub mod response;
pub mod scripting;
pub mod settings;
pub mod testing;

pub use auth::{ApiKeyPlacement, AuthConfig, DigestAlgorithm, DigestChallenge};
pub use collection::{Collection, CollectionConfig, CollectionItem, Folder, ScriptingConfig};
pub use diagnostics::{DebugEntry, DebugLevel, DebugLog, Timeline, TimelineEntry, Timing, Timings};
pub use environment::{ProcessEnvironment, VariableMap, VariableScope, VariableScopes};
pub use error::{DomainError, DomainResult};
pub use exchange::{AttemptClassification, AttemptRecord, AttemptRequest, HttpExchange};
pub use id::{generate_id, generate_token};
pub use request::{
    Header, Headers, HttpMethod, KeyValue, MultipartField, QueryParam, RequestBody, RequestItem,
    RequestScripts, RequestSettings, RequestVars,
};
pub use response::{BodyLocation, HttpResponse, REDIRECT_LIMIT_REACHED};
pub use scripting::{
    ConsoleEntry, ConsoleLevel, ScriptExecutionResult, ScriptPhase, ScriptRequest, ScriptResponse,
    TestResult, TestStatus,
};
pub use settings::EngineSettings;
pub use testing::{Assertion, AssertionResult, ComparisonOperator, StatusExpectation};
