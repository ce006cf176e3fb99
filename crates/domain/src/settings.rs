//! Engine-wide defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Redirects followed when neither the request nor the settings say otherwise.
pub const DEFAULT_MAX_REDIRECTS: u32 = 25;

/// Wall-clock limit for a single script run.
pub const DEFAULT_SCRIPT_TIMEOUT_MS: u64 = 10_000;

/// Engine settings, loaded once and shared by every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    /// Redirect cap used when a request sets none.
    #[serde(default = "default_max_redirects")]
    pub default_max_redirects: u32,

    /// Request timeout used when a request sets none; `None` means no timeout.
    #[serde(default)]
    pub default_timeout_ms: Option<u64>,

    /// `User-Agent` sent when the request has none.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Directory for persisted response bodies; `None` keeps them in memory.
    #[serde(default)]
    pub response_dir: Option<PathBuf>,

    /// Script timeout used when the collection sets none.
    #[serde(default = "default_script_timeout_ms")]
    pub script_timeout_ms: u64,

    /// Interpreter operation cap used when the collection sets none.
    #[serde(default)]
    pub script_max_operations: Option<u64>,
}

const fn default_max_redirects() -> u32 {
    DEFAULT_MAX_REDIRECTS
}

fn default_user_agent() -> String {
    concat!("relay/", env!("CARGO_PKG_VERSION")).to_string()
}

const fn default_script_timeout_ms() -> u64 {
    DEFAULT_SCRIPT_TIMEOUT_MS
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_max_redirects: default_max_redirects(),
            default_timeout_ms: None,
            user_agent: default_user_agent(),
            response_dir: None,
            script_timeout_ms: default_script_timeout_ms(),
            script_max_operations: None,
        }
    }
}
