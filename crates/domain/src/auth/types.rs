//! Authentication configuration types

use serde::{Deserialize, Serialize};

/// Authentication configuration for a request, folder or collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuthConfig {
    /// Use the nearest folder auth that is not `inherit`, else the collection auth.
    #[default]
    Inherit,
    /// No authentication.
    None,
    /// HTTP Basic authentication.
    Basic {
        /// Username (may contain placeholders).
        username: String,
        /// Password (may contain placeholders).
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// The token (may contain placeholders).
        token: String,
    },
    /// API key sent as a header or query parameter.
    ApiKey {
        /// Header or query parameter name.
        key: String,
        /// Key value.
        value: String,
        /// Where to add the key.
        #[serde(default)]
        placement: ApiKeyPlacement,
    },
    /// HTTP Digest authentication, negotiated on a 401 challenge.
    Digest {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// AWS Signature Version 4 request signing.
    AwsV4 {
        /// Access key id.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
        /// Optional session token, sent as `x-amz-security-token`.
        #[serde(default)]
        session_token: Option<String>,
        /// Service name, e.g. `execute-api` or `s3`.
        service: String,
        /// Region, e.g. `us-east-1`.
        region: String,
    },
}

/// Placement for API key authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyPlacement {
    /// Add to request headers.
    #[default]
    Header,
    /// Add to query parameters.
    QueryParams,
}

impl AuthConfig {
    /// Returns true for `Inherit`.
    #[must_use]
    pub const fn is_inherit(&self) -> bool {
        matches!(self, Self::Inherit)
    }

    /// The wire name of the mode, as exposed to scripts.
    #[must_use]
    pub const fn mode(&self) -> &'static str {
        match self {
            Self::Inherit => "inherit",
            Self::None => "none",
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
            Self::ApiKey { .. } => "apikey",
            Self::Digest { .. } => "digest",
            Self::AwsV4 { .. } => "awsv4",
        }
    }

    /// Creates a bearer token authentication.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Creates a basic authentication.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates a digest authentication.
    #[must_use]
    pub fn digest(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Digest {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns a copy with every string field passed through `f`.
    #[must_use]
    pub fn map_fields(&self, mut f: impl FnMut(&str) -> String) -> Self {
        match self {
            Self::Inherit => Self::Inherit,
            Self::None => Self::None,
            Self::Basic { username, password } => Self::Basic {
                username: f(username),
                password: f(password),
            },
            Self::Bearer { token } => Self::Bearer { token: f(token) },
            Self::ApiKey {
                key,
                value,
                placement,
            } => Self::ApiKey {
                key: f(key),
                value: f(value),
                placement: *placement,
            },
            Self::Digest { username, password } => Self::Digest {
                username: f(username),
                password: f(password),
            },
            Self::AwsV4 {
                access_key_id,
                secret_access_key,
                session_token,
                service,
                region,
            } => Self::AwsV4 {
                access_key_id: f(access_key_id),
                secret_access_key: f(secret_access_key),
                session_token: session_token.as_deref().map(&mut f),
                service: f(service),
                region: f(region),
            },
        }
    }
}
