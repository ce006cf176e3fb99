//! Application error types

use relay_domain::DomainError;
use thiserror::Error;

use crate::ports::{BodyStoreError, ScriptError, TransportError};

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// A lifecycle stage failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The requested item was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

/// The terminal error of a request, stored in its context.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// A script failed in the named stage.
    #[error("{stage} script failed: {source}")]
    Script {
        /// Stage label, e.g. `pre-request`.
        stage: &'static str,
        /// Underlying script failure.
        source: ScriptError,
    },

    /// A post-response variable expression failed.
    #[error("post-response variable '{name}' failed: {source}")]
    Variable {
        /// Variable name.
        name: String,
        /// Underlying script failure.
        source: ScriptError,
    },

    /// The request could not be built after interpolation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No response was obtained.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The final body could not be stored.
    #[error(transparent)]
    BodyStore(#[from] BodyStoreError),

    /// The abort token fired.
    #[error("request cancelled")]
    Cancelled,
}

impl LifecycleError {
    /// Wraps a script failure for `stage`.
    #[must_use]
    pub const fn script(stage: &'static str, source: ScriptError) -> Self {
        Self::Script { stage, source }
    }

    /// Whether the request was aborted by the caller.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Transport(TransportError::Cancelled))
    }
}

impl From<DomainError> for LifecycleError {
    fn from(error: DomainError) -> Self {
        Self::InvalidRequest(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn script_errors_name_their_stage() {
        let err = LifecycleError::script("pre-request", ScriptError::Runtime("boom".into()));
        assert_eq!(err.to_string(), "pre-request script failed: script error: boom");
    }

    #[test]
    fn transport_message_is_passed_through() {
        let err = LifecycleError::from(TransportError::NoResponse);
        assert_eq!(err.to_string(), "server did not return a response");
    }

    #[test]
    fn cancellation_is_detected_from_both_sources() {
        assert!(LifecycleError::Cancelled.is_cancelled());
        assert!(LifecycleError::Transport(TransportError::Cancelled).is_cancelled());
        assert!(!LifecycleError::InvalidRequest("x".into()).is_cancelled());
    }
}
