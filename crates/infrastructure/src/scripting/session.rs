//! State shared by every facade during one script run.

use std::cell::{Ref, RefCell, RefMut};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use relay_application::ports::ConsoleSink;
use relay_domain::{
    ConsoleEntry, ScriptExecutionResult, ScriptPhase, ScriptRequest, ScriptResponse, TestResult,
    VariableMap, VariableScopes,
};
use rhai::{EvalAltResult, Position};

/// Result type of fallible script-facing functions.
pub type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

/// Raises a script error carrying `message`.
pub fn script_error(message: impl Into<String>) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(message.into().into(), Position::NONE).into()
}

/// What scripts can change.
#[derive(Debug)]
pub struct MutableState {
    pub env: VariableMap,
    pub runtime: VariableMap,
    pub request: ScriptRequest,
    pub next_request_name: Option<String>,
    pub skip_request: bool,
    pub tests: Vec<TestResult>,
    pub console: Vec<ConsoleEntry>,
}

/// What scripts can only read.
pub struct Frame {
    pub phase: ScriptPhase,
    pub scopes: VariableScopes,
    pub response: Option<ScriptResponse>,
    pub collection_root: PathBuf,
    pub console: ConsoleSink,
    pub deadline: Option<Instant>,
}

/// Cheap handle cloned into each facade.
#[derive(Clone)]
pub struct Session {
    state: Rc<RefCell<MutableState>>,
    frame: Rc<Frame>,
}

impl Session {
    pub fn new(frame: Frame, request: ScriptRequest) -> Self {
        let state = MutableState {
            env: frame.scopes.environment.clone(),
            runtime: frame.scopes.runtime.clone(),
            request,
            next_request_name: None,
            skip_request: false,
            tests: Vec::new(),
            console: Vec::new(),
        };
        Self {
            state: Rc::new(RefCell::new(state)),
            frame: Rc::new(frame),
        }
    }

    pub fn state(&self) -> Ref<'_, MutableState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, MutableState> {
        self.state.borrow_mut()
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Scopes with the current environment and runtime groups.
    pub fn current_scopes(&self) -> VariableScopes {
        let state = self.state();
        let mut scopes = self.frame.scopes.clone();
        scopes.environment.clone_from(&state.env);
        scopes.runtime.clone_from(&state.runtime);
        scopes
    }

    /// Records a console line and forwards it to the caller's sink.
    pub fn emit_console(&self, entry: ConsoleEntry) {
        (self.frame.console)(entry.clone());
        self.state_mut().console.push(entry);
    }

    /// Records a test outcome.
    pub fn add_result(&self, result: TestResult) {
        self.state_mut().tests.push(result);
    }

    /// The final result. Facades still holding the session see a snapshot.
    pub fn finish(&self) -> ScriptExecutionResult {
        let state = self.state();
        ScriptExecutionResult {
            env_variables: state.env.clone(),
            runtime_variables: state.runtime.clone(),
            next_request_name: state.next_request_name.clone(),
            skip_request: state.skip_request,
            tests: state.tests.clone(),
            request: state.request.clone(),
            console: state.console.clone(),
        }
    }
}
