//! Variable groups and their precedence.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A variable group: ordered JSON values keyed by name.
pub type VariableMap = serde_json::Map<String, serde_json::Value>;

/// Identifies a variable group and its rank in the precedence order.
///
/// Declaration order is precedence order, lowest first:
/// process environment < environment < collection < folders (outer to inner) < request < runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableScope {
    /// Variables of the host process, exposed under `process.env.`.
    ProcessEnv,
    /// The active environment.
    Environment,
    /// Collection variables.
    Collection,
    /// Folder variables; the index is the depth, `0` being outermost.
    Folder(usize),
    /// Request variables.
    Request,
    /// Runtime variables written by scripts.
    Runtime,
}

impl VariableScope {
    /// Human-readable label, with folders enumerated positionally (`folder#0`).
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::ProcessEnv => "process.env".to_string(),
            Self::Environment => "environment".to_string(),
            Self::Collection => "collection".to_string(),
            Self::Folder(depth) => format!("folder#{depth}"),
            Self::Request => "request".to_string(),
            Self::Runtime => "runtime".to_string(),
        }
    }
}

impl fmt::Display for VariableScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Checks a variable name used by script accessors.
///
/// # Errors
///
/// Returns `DomainError::InvalidVariableName` when the name is empty or contains
/// characters outside `[A-Za-z0-9_.-]`.
pub fn validate_variable_name(name: &str) -> DomainResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(DomainError::InvalidVariableName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn precedence_follows_declaration_order() {
        assert!(VariableScope::ProcessEnv < VariableScope::Environment);
        assert!(VariableScope::Collection < VariableScope::Folder(0));
        assert!(VariableScope::Folder(0) < VariableScope::Folder(1));
        assert!(VariableScope::Folder(7) < VariableScope::Request);
        assert!(VariableScope::Request < VariableScope::Runtime);
    }

    #[test]
    fn folder_labels_are_positional() {
        assert_eq!(VariableScope::Folder(2).label(), "folder#2");
        assert_eq!(VariableScope::ProcessEnv.to_string(), "process.env");
    }

    #[test]
    fn variable_names_are_validated() {
        assert!(validate_variable_name("user.id").is_ok());
        assert!(validate_variable_name("api-key_2").is_ok());
        assert_eq!(
            validate_variable_name(""),
            Err(DomainError::InvalidVariableName(String::new()))
        );
        assert!(validate_variable_name("bad name").is_err());
        assert!(validate_variable_name("a{b}").is_err());
    }
}
