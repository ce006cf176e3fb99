//! Per-invocation request state.

use relay_domain::{
    AssertionResult, ConsoleEntry, DebugLevel, DebugLog, HttpExchange, HttpResponse, RequestItem,
    ScriptExecutionResult, ScriptPhase, TestResult, Timeline, Timings, VariableScopes,
};

use crate::error::LifecycleError;

/// Everything one request produced. Created per run, owned by the
/// orchestrator until it is handed back to the caller.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The request as it evolved through the pipeline.
    pub item: RequestItem,
    /// Variable groups, updated by scripts and variables stages.
    pub scopes: VariableScopes,
    /// One entry per transport attempt.
    pub timeline: Timeline,
    /// Stage timers.
    pub timings: Timings,
    /// In-band diagnostic log.
    pub debug: DebugLog,
    /// Chain of attempts.
    pub exchange: HttpExchange,
    /// The final response.
    pub response: Option<HttpResponse>,
    /// Request to jump to next in a collection run.
    pub next_request_name: Option<String>,
    /// Set when the pre-request script called `skipRequest()`.
    pub skipped: bool,
    /// Declarative assertion outcomes.
    pub assertion_results: Vec<AssertionResult>,
    /// Script test outcomes, post-response first.
    pub test_results: Vec<TestResult>,
    /// Console output of every script.
    pub console: Vec<ConsoleEntry>,
    /// Terminal error, if a stage failed.
    pub error: Option<LifecycleError>,
}

impl RequestContext {
    /// Creates an empty context for `item`.
    #[must_use]
    pub fn new(item: RequestItem, scopes: VariableScopes) -> Self {
        Self {
            item,
            scopes,
            timeline: Timeline::default(),
            timings: Timings::default(),
            debug: DebugLog::default(),
            exchange: HttpExchange::new(),
            response: None,
            next_request_name: None,
            skipped: false,
            assertion_results: Vec::new(),
            test_results: Vec::new(),
            console: Vec::new(),
            error: None,
        }
    }

    /// The request uid.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.item.uid
    }

    /// Whether the lifecycle ran without a terminal error.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Assertions and tests that passed.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.assertion_results.iter().filter(|r| r.passed).count()
            + self.test_results.iter().filter(|r| r.passed()).count()
    }

    /// Assertions and tests that failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.assertion_results.iter().filter(|r| !r.passed).count()
            + self.test_results.iter().filter(|r| !r.passed()).count()
    }

    /// Merges a script result by replacement.
    ///
    /// The request is written back only in the pre-request phase.
    pub fn apply_script_result(&mut self, phase: ScriptPhase, result: ScriptExecutionResult) {
        self.scopes.environment = result.env_variables;
        self.scopes.runtime = result.runtime_variables;
        if result.next_request_name.is_some() {
            self.next_request_name = result.next_request_name;
        }
        if phase == ScriptPhase::PreRequest {
            result.request.apply_to(&mut self.item);
            self.skipped |= result.skip_request;
        }
        self.test_results.extend(result.tests);
        self.console.extend(result.console);
    }

    /// Stores the terminal error and logs it.
    pub fn fail(&mut self, stage: &str, error: LifecycleError) {
        self.debug.log(DebugLevel::Error, stage, error.to_string());
        self.error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relay_domain::{ScriptRequest, VariableMap};
    use serde_json::json;

    fn result_with(item: &RequestItem) -> ScriptExecutionResult {
        let mut env = VariableMap::new();
        env.insert("token".into(), json!("abc"));
        let mut request = ScriptRequest::from_item(item);
        request.url = "http://changed.test".into();
        let mut result = ScriptExecutionResult::unchanged(env, VariableMap::new(), request);
        result.skip_request = true;
        result.next_request_name = Some("Next".into());
        result.tests.push(TestResult::pass("ok"));
        result
    }

    #[test]
    fn pre_request_results_update_the_request() {
        let item = RequestItem::get("r", "http://orig.test");
        let mut ctx = RequestContext::new(item.clone(), VariableScopes::new());

        ctx.apply_script_result(ScriptPhase::PreRequest, result_with(&item));

        assert_eq!(ctx.item.url, "http://changed.test");
        assert!(ctx.skipped);
        assert_eq!(ctx.next_request_name.as_deref(), Some("Next"));
        assert_eq!(ctx.scopes.environment.get("token"), Some(&json!("abc")));
        assert_eq!(ctx.passed_count(), 1);
    }

    #[test]
    fn later_phases_leave_the_request_alone() {
        let item = RequestItem::get("r", "http://orig.test");
        let mut ctx = RequestContext::new(item.clone(), VariableScopes::new());

        ctx.apply_script_result(ScriptPhase::PostResponse, result_with(&item));

        assert_eq!(ctx.item.url, "http://orig.test");
        assert!(!ctx.skipped);
    }

    #[test]
    fn fail_records_error_and_debug_entry() {
        let mut ctx = RequestContext::new(RequestItem::get("r", "x"), VariableScopes::new());
        ctx.fail("transport", LifecycleError::Cancelled);
        assert!(!ctx.is_ok());
        assert_eq!(ctx.debug.at_level(DebugLevel::Error).count(), 1);
    }
}
