//! Collection, folder and item types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::auth::AuthConfig;
use crate::environment::VariableMap;
use crate::request::{Headers, RequestItem, RequestScripts};

/// Scripting capabilities granted to a collection's scripts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptingConfig {
    /// Host module names allowed in addition to the built-in allow-list.
    #[serde(default)]
    pub module_whitelist: Vec<String>,
    /// Grants the `fs` host module.
    #[serde(default)]
    pub filesystem_access: bool,
    /// Directories searched for `<name>.rhai` modules, relative to the collection root unless absolute.
    #[serde(default)]
    pub additional_context_roots: Vec<String>,
    /// Wall-clock limit per script run, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Upper bound on interpreter operations per script run.
    #[serde(default)]
    pub max_operations: Option<u64>,
}

/// Collection-level configuration read by the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConfig {
    /// Scripting capabilities.
    #[serde(default)]
    pub scripting: ScriptingConfig,
}

/// A folder: a scope for headers, auth, scripts and variables, plus child items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    /// Folder name.
    pub name: String,
    /// Headers applied to every request below this folder.
    #[serde(default)]
    pub headers: Headers,
    /// Folder auth; `Inherit` defers to the parent.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Folder-level scripts.
    #[serde(default)]
    pub scripts: RequestScripts,
    /// Folder-level test script.
    #[serde(default)]
    pub tests: String,
    /// Folder variables, one group per nesting level during a run.
    #[serde(default)]
    pub variables: VariableMap,
    /// Child items in run order.
    #[serde(default)]
    pub items: Vec<CollectionItem>,
}

impl Folder {
    /// Creates a new empty folder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a child item (builder pattern).
    #[must_use]
    pub fn with_item(mut self, item: CollectionItem) -> Self {
        self.items.push(item);
        self
    }
}

/// An item in a collection: either a folder or a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionItem {
    /// A folder containing other items.
    Folder(Folder),
    /// A request.
    Request(RequestItem),
}

impl CollectionItem {
    /// Returns the name of this item.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Folder(f) => &f.name,
            Self::Request(r) => &r.name,
        }
    }
}

/// A collection: root scope of headers, auth and scripts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// Collection name.
    pub name: String,
    /// Directory the collection was loaded from; base for relative paths.
    #[serde(default)]
    pub root_path: PathBuf,
    /// Headers applied to every request.
    #[serde(default)]
    pub headers: Headers,
    /// Collection auth, the fallback for `Inherit`.
    #[serde(default = "collection_default_auth")]
    pub auth: AuthConfig,
    /// Collection-level scripts.
    #[serde(default)]
    pub scripts: RequestScripts,
    /// Collection-level test script.
    #[serde(default)]
    pub tests: String,
    /// Configuration read by the core.
    #[serde(default)]
    pub config: CollectionConfig,
    /// Top-level items in run order.
    #[serde(default)]
    pub items: Vec<CollectionItem>,
}

const fn collection_default_auth() -> AuthConfig {
    AuthConfig::None
}

impl Collection {
    /// Creates a new empty collection rooted at `root_path`.
    #[must_use]
    pub fn new(name: impl Into<String>, root_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root_path: root_path.into(),
            auth: AuthConfig::None,
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scripting_config_is_camel_case() {
        let config: CollectionConfig = serde_json::from_str(
            r#"{"scripting":{"moduleWhitelist":["lodash"],"filesystemAccess":true,"additionalContextRoots":["lib"]}}"#,
        )
        .unwrap();
        assert_eq!(config.scripting.module_whitelist, vec!["lodash".to_string()]);
        assert!(config.scripting.filesystem_access);
        assert_eq!(config.scripting.timeout_ms, None);
    }

    #[test]
    fn collection_auth_defaults_to_none() {
        let collection: Collection = serde_json::from_str(r#"{"name":"api"}"#).unwrap();
        assert_eq!(collection.auth, AuthConfig::None);
    }

    #[test]
    fn items_are_externally_tagged() {
        let item: CollectionItem =
            serde_json::from_str(r#"{"folder":{"name":"users","items":[]}}"#).unwrap();
        assert_eq!(item.name(), "users");
    }
}
