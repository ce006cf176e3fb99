//! The full set of variable groups available to one request.

use serde::{Deserialize, Serialize};

use super::flatten::{FlatScope, flatten};
use super::process::ProcessEnvironment;
use super::variable::{VariableMap, VariableScope};

/// Every variable group visible to a request, owned by its context.
///
/// Scripts mutate `environment` and `runtime`; the pipeline writes
/// `request` (pre-request vars) and `runtime` (post-response vars).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableScopes {
    /// Host process variables.
    #[serde(default)]
    pub process_env: ProcessEnvironment,
    /// Active environment variables.
    #[serde(default)]
    pub environment: VariableMap,
    /// Active environment name, if any.
    #[serde(default)]
    pub environment_name: Option<String>,
    /// Collection variables.
    #[serde(default)]
    pub collection: VariableMap,
    /// Folder variables, outermost first.
    #[serde(default)]
    pub folders: Vec<VariableMap>,
    /// Request variables.
    #[serde(default)]
    pub request: VariableMap,
    /// Runtime variables.
    #[serde(default)]
    pub runtime: VariableMap,
}

impl VariableScopes {
    /// Creates empty scopes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the active environment (builder pattern).
    #[must_use]
    pub fn with_environment(mut self, name: impl Into<String>, vars: VariableMap) -> Self {
        self.environment_name = Some(name.into());
        self.environment = vars;
        self
    }

    /// Sets the collection group (builder pattern).
    #[must_use]
    pub fn with_collection(mut self, vars: VariableMap) -> Self {
        self.collection = vars;
        self
    }

    /// Sets the runtime group (builder pattern).
    #[must_use]
    pub fn with_runtime(mut self, vars: VariableMap) -> Self {
        self.runtime = vars;
        self
    }

    /// Sets the process environment (builder pattern).
    #[must_use]
    pub fn with_process_env(mut self, env: ProcessEnvironment) -> Self {
        self.process_env = env;
        self
    }

    /// Returns true when no group holds any variable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.process_env.is_empty()
            && self.environment.is_empty()
            && self.collection.is_empty()
            && self.folders.iter().all(VariableMap::is_empty)
            && self.request.is_empty()
            && self.runtime.is_empty()
    }

    /// The raw group for `scope`, if it exists.
    ///
    /// The process environment is not a JSON group and yields `None`.
    #[must_use]
    pub fn group(&self, scope: VariableScope) -> Option<&VariableMap> {
        match scope {
            VariableScope::ProcessEnv => None,
            VariableScope::Environment => Some(&self.environment),
            VariableScope::Collection => Some(&self.collection),
            VariableScope::Folder(depth) => self.folders.get(depth),
            VariableScope::Request => Some(&self.request),
            VariableScope::Runtime => Some(&self.runtime),
        }
    }

    /// Every group flattened, in precedence order (lowest first).
    #[must_use]
    pub fn flattened_groups(&self) -> Vec<(VariableScope, FlatScope)> {
        let mut groups = Vec::with_capacity(5 + self.folders.len());
        groups.push((VariableScope::ProcessEnv, self.process_env.flatten()));
        groups.push((VariableScope::Environment, flatten(&self.environment)));
        groups.push((VariableScope::Collection, flatten(&self.collection)));
        for (depth, folder) in self.folders.iter().enumerate() {
            groups.push((VariableScope::Folder(depth), flatten(folder)));
        }
        groups.push((VariableScope::Request, flatten(&self.request)));
        groups.push((VariableScope::Runtime, flatten(&self.runtime)));
        groups
    }

    /// All groups merged into one lookup table; higher precedence wins.
    #[must_use]
    pub fn merged(&self) -> FlatScope {
        let mut merged = FlatScope::new();
        for (_, group) in self.flattened_groups() {
            merged.extend(group);
        }
        merged
    }
}
