//! The request lifecycle orchestrator.

use std::sync::Arc;

use relay_domain::environment::validate_variable_name;
use relay_domain::{
    Collection, DebugLevel, EngineSettings, Folder, RequestItem, ScriptPhase, ScriptRequest,
    ScriptResponse, ScriptingConfig, VariableScopes,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::assertions::evaluate_all;
use super::build::build_transport_request;
use super::context::RequestContext;
use super::interpolate::interpolate_request;
use super::settings::{ComposedScripts, apply_collection_settings};
use crate::error::LifecycleError;
use crate::ports::{
    CancellationToken, Clock, ConsoleSink, GatedEvents, HttpSend, RequestEvents,
    ResponseBodyStore, ScriptInvocation, ScriptRunner,
};
use crate::transport::TransportMachine;
use crate::variable_resolver::VariableResolver;

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Engine defaults: redirect cap, timeouts, user agent, script limits.
    pub settings: EngineSettings,
}

impl RunOptions {
    /// Options over the given settings.
    #[must_use]
    pub const fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }
}

/// A stage failure, tagged with the stage that raised it.
struct StageFailure {
    stage: &'static str,
    error: LifecycleError,
}

trait AtStage<T> {
    fn at(self, stage: &'static str) -> Result<T, StageFailure>;
}

impl<T, E: Into<LifecycleError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: &'static str) -> Result<T, StageFailure> {
        self.map_err(|e| StageFailure {
            stage,
            error: e.into(),
        })
    }
}

/// Borrowed inputs shared by every stage of one run.
struct Run<'a> {
    collection: &'a Collection,
    options: &'a RunOptions,
    events: &'a Arc<dyn RequestEvents>,
    cancel: &'a CancellationToken,
}

impl Run<'_> {
    fn gate(&self) -> GatedEvents<'_> {
        GatedEvents::new(self.events.as_ref(), self.cancel)
    }

    fn check_cancelled(&self) -> Result<(), LifecycleError> {
        if self.cancel.is_cancelled() {
            Err(LifecycleError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Collection scripting config with engine defaults filled in.
    fn scripting_config(&self) -> ScriptingConfig {
        let mut config = self.collection.config.scripting.clone();
        config.timeout_ms = config.timeout_ms.or(Some(self.options.settings.script_timeout_ms));
        config.max_operations = config
            .max_operations
            .or(self.options.settings.script_max_operations);
        config
    }

    fn console_sink(&self, uid: &str) -> ConsoleSink {
        let events = Arc::clone(self.events);
        let cancel = self.cancel.clone();
        let uid = uid.to_string();
        Arc::new(move |entry| {
            if !cancel.is_cancelled() {
                events.console_log(&uid, &entry);
            }
        })
    }

    fn invocation(&self, ctx: &RequestContext, script: String, phase: ScriptPhase) -> ScriptInvocation {
        ScriptInvocation {
            script,
            phase,
            request: ScriptRequest::from_item(&ctx.item),
            response: ctx.response.as_ref().map(ScriptResponse::from_response),
            scopes: ctx.scopes.clone(),
            config: self.scripting_config(),
            collection_root: self.collection.root_path.clone(),
            console: self.console_sink(ctx.uid()),
        }
    }
}

/// Runs one request through the full pipeline.
///
/// `applyCollectionSettings → preRequestVariables → preRequestScript →
/// interpolateRequest → buildTransportRequest → transportExchange →
/// postRequestVariables → postRequestScript → assertions → tests`
///
/// # Example
///
/// ```ignore
/// let runner = RunRequest::new(http, sandbox, bodies, clock);
/// let ctx = runner
///     .run(item, &collection, &[], scopes, &RunOptions::default(), events, &cancel)
///     .await;
/// assert!(ctx.is_ok());
/// ```
pub struct RunRequest<H: HttpSend, S: ScriptRunner, B: ResponseBodyStore> {
    transport: TransportMachine<H, B>,
    scripts: Arc<S>,
}

impl<H: HttpSend, S: ScriptRunner, B: ResponseBodyStore> RunRequest<H, S, B> {
    /// Creates the orchestrator over its ports.
    #[must_use]
    pub fn new(http: Arc<H>, scripts: Arc<S>, bodies: Arc<B>, clock: Arc<dyn Clock>) -> Self {
        Self {
            transport: TransportMachine::new(http, bodies, clock),
            scripts,
        }
    }

    /// Runs `item`. Never fails: stage errors end up in `RequestContext::error`.
    ///
    /// `folders` is the chain from the outermost folder to the one holding the
    /// request; their variables live in `scopes.folders`.
    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        &self,
        item: RequestItem,
        collection: &Collection,
        folders: &[Folder],
        scopes: VariableScopes,
        options: &RunOptions,
        events: Arc<dyn RequestEvents>,
        cancel: &CancellationToken,
    ) -> RequestContext {
        let run = Run {
            collection,
            options,
            events: &events,
            cancel,
        };
        let mut ctx = RequestContext::new(item, scopes);
        let uid = ctx.uid().to_string();

        info!(uid = %uid, name = %ctx.item.name, "Running request");
        run.gate().emit(|e| e.request_queued(&uid));
        ctx.timings.start("total");

        if let Err(failure) = self.run_stages(&mut ctx, folders, &run).await {
            warn!(uid = %uid, stage = failure.stage, error = %failure.error, "Request failed");
            ctx.fail(failure.stage, failure.error);
        }

        ctx.timings.stop("total");
        ctx.timings.finalize();
        ctx
    }

    async fn run_stages(
        &self,
        ctx: &mut RequestContext,
        folders: &[Folder],
        run: &Run<'_>,
    ) -> Result<(), StageFailure> {
        let uid = ctx.uid().to_string();

        let (effective, scripts) = apply_collection_settings(&ctx.item, run.collection, folders);
        ctx.item = effective;
        ctx.debug.log(
            DebugLevel::Info,
            "applyCollectionSettings",
            format!("auth mode '{}'", ctx.item.auth.mode()),
        );

        run.check_cancelled().at("preRequestVariables")?;
        self.pre_request_variables(ctx).at("preRequestVariables")?;

        run.check_cancelled().at("preRequestScript")?;
        self.run_phase(ctx, run, &scripts, ScriptPhase::PreRequest, "pre-script")
            .await
            .at("preRequestScript")?;
        if ctx.skipped {
            info!(uid = %uid, "Request skipped by pre-request script");
            ctx.debug
                .log(DebugLevel::Info, "preRequestScript", "request skipped");
            return Ok(());
        }

        run.check_cancelled().at("interpolateRequest")?;
        let resolver = VariableResolver::new(&ctx.scopes);
        let (resolved, unresolved) = interpolate_request(&ctx.item, &resolver);
        ctx.item = resolved;
        for expr in unresolved {
            ctx.debug.log(
                DebugLevel::Warn,
                "interpolateRequest",
                format!("unresolved placeholder {{{{{expr}}}}}"),
            );
        }

        let request = build_transport_request(
            &ctx.item,
            &run.options.settings,
            &run.collection.root_path,
        )
        .await
        .at("buildTransportRequest")?;

        run.check_cancelled().at("transportExchange")?;
        ctx.timings.start("request");
        let gate = run.gate();
        let response = self
            .transport
            .execute(
                request,
                &mut ctx.exchange,
                &mut ctx.timeline,
                run.cancel,
                |attempt| gate.emit(|e| e.request_sent(&uid, attempt)),
            )
            .await
            .at("transportExchange")?;
        ctx.timings.stop("request");

        if response.redirect_limit_reached() {
            ctx.debug.log(
                DebugLevel::Warn,
                "transportExchange",
                relay_domain::REDIRECT_LIMIT_REACHED,
            );
        }
        let cookies: Vec<String> = response
            .headers
            .get_all("set-cookie")
            .into_iter()
            .map(str::to_string)
            .collect();
        if !cookies.is_empty() {
            gate.emit(|e| e.cookie_updated(&uid, &cookies));
        }
        debug!(uid = %uid, status = response.status, "Response received");
        ctx.response = Some(response);

        run.check_cancelled().at("postRequestVariables")?;
        self.post_request_variables(ctx, run)
            .await
            .at("postRequestVariables")?;

        run.check_cancelled().at("postRequestScript")?;
        self.run_phase(ctx, run, &scripts, ScriptPhase::PostResponse, "post-script")
            .await
            .at("postRequestScript")?;

        run.check_cancelled().at("assertions")?;
        if let Some(response) = ctx.response.as_ref().filter(|_| !ctx.item.assertions.is_empty()) {
            let resolver = VariableResolver::new(&ctx.scopes);
            let results = evaluate_all(&ctx.item.assertions, response, &resolver);
            gate.emit(|e| e.assertion_results(&uid, &results));
            ctx.assertion_results = results;
        }

        run.check_cancelled().at("tests")?;
        let ran_tests = self
            .run_phase(ctx, run, &scripts, ScriptPhase::Tests, "test")
            .await
            .at("tests")?;
        if ran_tests || !ctx.test_results.is_empty() {
            gate.emit(|e| e.test_results(&uid, &ctx.test_results));
        }

        Ok(())
    }

    /// Stores every enabled request var, interpolated, in the request group.
    fn pre_request_variables(&self, ctx: &mut RequestContext) -> Result<(), LifecycleError> {
        let vars: Vec<_> = ctx.item.vars.req.iter().filter(|v| v.enabled).cloned().collect();
        for var in vars {
            validate_variable_name(&var.name)?;
            let value = VariableResolver::new(&ctx.scopes).resolve(&var.value);
            ctx.scopes.request.insert(var.name, Value::String(value));
        }
        Ok(())
    }

    /// Evaluates every enabled response var in the sandbox into the runtime group.
    async fn post_request_variables(
        &self,
        ctx: &mut RequestContext,
        run: &Run<'_>,
    ) -> Result<(), LifecycleError> {
        let vars: Vec<_> = ctx.item.vars.res.iter().filter(|v| v.enabled).cloned().collect();
        for var in vars {
            validate_variable_name(&var.name)?;
            let invocation = run.invocation(ctx, String::new(), ScriptPhase::PostResponse);
            let value = self
                .scripts
                .evaluate_expression(var.value.clone(), invocation)
                .await
                .map_err(|source| LifecycleError::Variable {
                    name: var.name.clone(),
                    source,
                })?;
            ctx.scopes.runtime.insert(var.name, value);
        }
        Ok(())
    }

    /// Runs the composed script for `phase`. Returns whether a script ran.
    async fn run_phase(
        &self,
        ctx: &mut RequestContext,
        run: &Run<'_>,
        scripts: &ComposedScripts,
        phase: ScriptPhase,
        timer: &str,
    ) -> Result<bool, LifecycleError> {
        let script = match phase {
            ScriptPhase::PreRequest => &scripts.pre_request,
            ScriptPhase::PostResponse => &scripts.post_response,
            ScriptPhase::Tests => &scripts.tests,
        };
        if script.trim().is_empty() {
            return Ok(false);
        }

        ctx.timings.start(timer);
        let invocation = run.invocation(ctx, script.clone(), phase);
        debug!(uid = %ctx.uid(), phase = phase.label(), "Running script");
        let result = self
            .scripts
            .run_script(invocation)
            .await
            .map_err(|e| LifecycleError::script(phase.label(), e))?;
        ctx.timings.stop(timer);

        ctx.apply_script_result(phase, result);
        let uid = ctx.uid().to_string();
        run.gate().emit(|e| {
            e.update_script_environment(&uid, &ctx.scopes.environment, &ctx.scopes.runtime);
        });
        Ok(true)
    }
}
