//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The provided URL is invalid or malformed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// A variable name contains characters outside `[A-Za-z0-9_.-]` or is empty.
    #[error("invalid variable name '{0}': names may only contain letters, digits, '_', '.' and '-'")]
    InvalidVariableName(String),

    /// The request body is invalid for its declared mode.
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// A digest challenge header could not be parsed.
    #[error("invalid digest challenge: {0}")]
    InvalidDigestChallenge(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
