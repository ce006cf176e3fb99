//! Script execution port

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use relay_domain::{
    ConsoleEntry, ScriptExecutionResult, ScriptPhase, ScriptRequest, ScriptResponse,
    ScriptingConfig, VariableScopes,
};
use thiserror::Error;

/// Receives console output as the script produces it.
pub type ConsoleSink = Arc<dyn Fn(ConsoleEntry) + Send + Sync>;

/// A sink that drops everything.
#[must_use]
pub fn discard_console() -> ConsoleSink {
    Arc::new(|_| {})
}

/// Everything one script run needs. Owned, so it can cross to a worker thread.
#[derive(Clone)]
pub struct ScriptInvocation {
    /// Script text.
    pub script: String,
    /// Pipeline stage.
    pub phase: ScriptPhase,
    /// Request snapshot for `req`.
    pub request: ScriptRequest,
    /// Response snapshot for `res`; `None` before the exchange.
    pub response: Option<ScriptResponse>,
    /// Variable groups; `environment` and `runtime` come back in the result.
    pub scopes: VariableScopes,
    /// Module allow-list, roots and limits, with engine defaults applied.
    pub config: ScriptingConfig,
    /// Collection directory, returned by `bru.cwd()` and base for relative roots.
    pub collection_root: PathBuf,
    /// Console output sink.
    pub console: ConsoleSink,
}

impl fmt::Debug for ScriptInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptInvocation")
            .field("phase", &self.phase)
            .field("script_len", &self.script.len())
            .field("has_response", &self.response.is_some())
            .field("collection_root", &self.collection_root)
            .finish_non_exhaustive()
    }
}

/// Failures of a script run. Each aborts the pipeline stage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    /// The script did not parse.
    #[error("script compile error: {0}")]
    Compile(String),

    /// The script raised, including failed module imports and invalid variable names.
    #[error("script error: {0}")]
    Runtime(String),

    /// The wall-clock limit elapsed.
    #[error("script timed out after {timeout_ms}ms")]
    Timeout {
        /// The limit that elapsed.
        timeout_ms: u64,
    },

    /// The operation cap was reached.
    #[error("script exceeded {max_operations} operations")]
    OperationLimit {
        /// The cap.
        max_operations: u64,
    },

    /// The worker running the script failed.
    #[error("script worker failed: {0}")]
    Worker(String),
}

/// Port for running user scripts in an isolated interpreter.
pub trait ScriptRunner: Send + Sync {
    /// Runs a whole script once, to completion.
    ///
    /// Empty or whitespace-only scripts return the input bags unchanged
    /// without starting an interpreter.
    ///
    /// # Errors
    ///
    /// Returns a `ScriptError` when the script fails to compile, raises or hits a limit.
    fn run_script(
        &self,
        invocation: ScriptInvocation,
    ) -> impl Future<Output = Result<ScriptExecutionResult, ScriptError>> + Send;

    /// Evaluates a single expression with the same globals and returns its JSON value.
    ///
    /// # Errors
    ///
    /// Returns a `ScriptError` when the expression fails.
    fn evaluate_expression(
        &self,
        expression: String,
        invocation: ScriptInvocation,
    ) -> impl Future<Output = Result<serde_json::Value, ScriptError>> + Send;
}
