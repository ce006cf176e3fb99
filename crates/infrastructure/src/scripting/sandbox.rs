//! Rhai script sandbox.
//!
//! Every run gets a fresh engine on a blocking worker thread. The engine sees
//! only the facades, `console`, the restricted module resolver and, in test
//! phases, the test recorder. Variable bags cross in and out as JSON.

use std::time::{Duration, Instant};

use relay_application::ports::{ScriptError, ScriptInvocation, ScriptRunner};
use relay_domain::ScriptExecutionResult;
use relay_domain::settings::DEFAULT_SCRIPT_TIMEOUT_MS;
use rhai::{Dynamic, Engine, EvalAltResult, Scope};
use serde_json::Value;
use tracing::debug;

use super::bridge::{BigNumber, to_json};
use super::console::{self, ConsoleFacade};
use super::facades::{self, BruFacade, RequestFacade, ResponseFacade, failure_details, root_cause};
use super::modules::RestrictedModules;
use super::session::{Frame, Session};

/// Runs scripts in isolated Rhai engines.
#[derive(Debug, Clone, Copy, Default)]
pub struct RhaiSandbox;

impl RhaiSandbox {
    /// Creates a sandbox.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Limits in force for one run, kept for error reporting.
#[derive(Debug, Clone, Copy)]
struct Limits {
    timeout_ms: u64,
    max_operations: Option<u64>,
}

struct Prepared {
    engine: Engine,
    scope: Scope<'static>,
    session: Session,
    limits: Limits,
}

fn prepare(invocation: ScriptInvocation) -> Prepared {
    let ScriptInvocation {
        phase,
        request,
        response,
        scopes,
        config,
        collection_root,
        console,
        ..
    } = invocation;

    let limits = Limits {
        timeout_ms: config.timeout_ms.unwrap_or(DEFAULT_SCRIPT_TIMEOUT_MS),
        max_operations: config.max_operations.filter(|max| *max > 0),
    };
    let deadline = Instant::now() + Duration::from_millis(limits.timeout_ms);

    let mut engine = Engine::new();
    engine.disable_symbol("eval");
    if let Some(max) = limits.max_operations {
        engine.set_max_operations(max);
    }
    engine.on_progress(move |_| (Instant::now() >= deadline).then_some(Dynamic::UNIT));
    engine.set_module_resolver(RestrictedModules::new(&config, &collection_root));
    engine
        .register_type_with_name::<BigNumber>("BigNumber")
        .register_fn("to_string", |n: &mut BigNumber| n.to_string())
        .register_fn("to_debug", |n: &mut BigNumber| n.to_string());

    let session = Session::new(
        Frame {
            phase,
            scopes,
            response: response.clone(),
            collection_root,
            console,
            deadline: Some(deadline),
        },
        request,
    );
    console::register(&mut engine, &session);
    facades::register(&mut engine, &session, phase.is_test_capable());

    let mut scope = Scope::new();
    scope.push("bru", BruFacade::new(session.clone()));
    scope.push("req", RequestFacade::new(session.clone()));
    scope.push("console", ConsoleFacade::new(session.clone()));
    match response {
        Some(response) => scope.push("res", ResponseFacade::new(response)),
        None => scope.push_dynamic("res", Dynamic::UNIT),
    };

    Prepared {
        engine,
        scope,
        session,
        limits,
    }
}

fn map_error(error: &EvalAltResult, limits: Limits) -> ScriptError {
    match root_cause(error) {
        EvalAltResult::ErrorTerminated(..) => ScriptError::Timeout {
            timeout_ms: limits.timeout_ms,
        },
        EvalAltResult::ErrorTooManyOperations(..) => ScriptError::OperationLimit {
            max_operations: limits.max_operations.unwrap_or_default(),
        },
        EvalAltResult::ErrorParsing(..) => ScriptError::Compile(error.to_string()),
        _ => ScriptError::Runtime(failure_details(error).0),
    }
}

fn execute_script(script: &str, invocation: ScriptInvocation) -> Result<ScriptExecutionResult, ScriptError> {
    let Prepared {
        engine,
        mut scope,
        session,
        limits,
    } = prepare(invocation);

    let ast = engine
        .compile(script)
        .map_err(|e| ScriptError::Compile(e.to_string()))?;
    engine
        .run_ast_with_scope(&mut scope, &ast)
        .map_err(|e| map_error(&e, limits))?;

    Ok(session.finish())
}

fn evaluate(expression: &str, invocation: ScriptInvocation) -> Result<Value, ScriptError> {
    let Prepared {
        engine,
        mut scope,
        limits,
        ..
    } = prepare(invocation);

    let value = engine
        .eval_with_scope::<Dynamic>(&mut scope, expression)
        .map_err(|e| map_error(&e, limits))?;
    Ok(to_json(&value).unwrap_or(Value::Null))
}

impl ScriptRunner for RhaiSandbox {
    async fn run_script(
        &self,
        invocation: ScriptInvocation,
    ) -> Result<ScriptExecutionResult, ScriptError> {
        if invocation.script.trim().is_empty() {
            return Ok(ScriptExecutionResult::unchanged(
                invocation.scopes.environment,
                invocation.scopes.runtime,
                invocation.request,
            ));
        }

        let phase = invocation.phase;
        let started = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            let script = invocation.script.clone();
            execute_script(&script, invocation)
        })
        .await
        .map_err(|e| ScriptError::Worker(e.to_string()))?;

        debug!(
            phase = phase.label(),
            elapsed_ms = started.elapsed().as_millis(),
            ok = result.is_ok(),
            "Script finished"
        );
        result
    }

    async fn evaluate_expression(
        &self,
        expression: String,
        invocation: ScriptInvocation,
    ) -> Result<Value, ScriptError> {
        tokio::task::spawn_blocking(move || evaluate(&expression, invocation))
            .await
            .map_err(|e| ScriptError::Worker(e.to_string()))?
    }
}
