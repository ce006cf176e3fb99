//! Query parameter and generic key/value types

use serde::{Deserialize, Serialize};

const fn default_enabled() -> bool {
    true
}

/// A query parameter appended to the request URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    /// The parameter key.
    pub key: String,
    /// The parameter value.
    pub value: String,
    /// Whether this parameter is sent.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl QueryParam {
    /// Creates a new enabled query parameter.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Creates a disabled query parameter.
    #[must_use]
    pub fn disabled(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            enabled: false,
            ..Self::new(key, value)
        }
    }
}

/// A named value with an enabled flag, used by form bodies and request variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// Entry name.
    pub name: String,
    /// Entry value (may contain placeholders or, for post-response vars, an expression).
    pub value: String,
    /// Whether the entry is active.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl KeyValue {
    /// Creates an enabled entry.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Creates a disabled entry.
    #[must_use]
    pub fn disabled(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            enabled: false,
            ..Self::new(name, value)
        }
    }
}
