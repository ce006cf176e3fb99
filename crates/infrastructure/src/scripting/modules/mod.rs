//! Restricted `import` resolution.
//!
//! Scripts may import host modules from the allow-list, whitelisted packages
//! from `<collection root>/modules/<name>.rhai` and `<name>.rhai` files found
//! under the configured roots. Nothing else resolves, and no file may resolve
//! outside the directory it was found in.

mod host;

use std::path::{Component, Path, PathBuf};

use relay_domain::ScriptingConfig;
use rhai::{Dynamic, Engine, EvalAltResult, Module, ModuleResolver, Position, Scope, Shared};
use tracing::{debug, warn};

type SharedModule = Shared<Module>;

/// Host modules available without configuration.
pub const DEFAULT_MODULES: [&str; 5] = ["json", "crypto", "encoding", "url", "time"];

/// Directory under the collection root holding whitelisted script packages.
pub const PACKAGE_DIR: &str = "modules";

/// Module resolver enforcing the allow-list and root search.
#[derive(Debug, Clone)]
pub struct RestrictedModules {
    allowed: Vec<String>,
    packages: Vec<String>,
    package_root: PathBuf,
    roots: Vec<PathBuf>,
    collection_root: PathBuf,
}

impl RestrictedModules {
    pub fn new(config: &ScriptingConfig, collection_root: &Path) -> Self {
        let mut allowed: Vec<String> = DEFAULT_MODULES.iter().map(ToString::to_string).collect();
        let mut packages = Vec::new();
        for name in &config.module_whitelist {
            if name == "fs" || allowed.contains(name) {
                continue;
            }
            if host::HOST_MODULES.contains(&name.as_str()) {
                allowed.push(name.clone());
            } else if is_safe_name(name) {
                allowed.push(name.clone());
                packages.push(name.clone());
            } else {
                warn!(module = %name, "Ignoring unusable whitelist entry");
            }
        }
        if config.filesystem_access {
            allowed.push("fs".to_string());
        }
        let roots = config
            .additional_context_roots
            .iter()
            .map(|root| {
                let root = Path::new(root);
                if root.is_absolute() {
                    root.to_path_buf()
                } else {
                    collection_root.join(root)
                }
            })
            .collect();
        Self {
            allowed,
            packages,
            package_root: collection_root.join(PACKAGE_DIR),
            roots,
            collection_root: collection_root.to_path_buf(),
        }
    }

    /// Effective allow-list: host modules plus whitelisted packages.
    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    fn is_package(&self, name: &str) -> bool {
        self.packages.iter().any(|p| p == name)
    }

    /// Directories searched for `name`, in order.
    fn search_path(&self, name: &str) -> Vec<&Path> {
        let package = self
            .is_package(name)
            .then_some(self.package_root.as_path());
        package
            .into_iter()
            .chain(self.roots.iter().map(PathBuf::as_path))
            .collect()
    }

    fn denied(&self, name: &str, pos: Position) -> Box<EvalAltResult> {
        let searched = self.search_path(name);
        let roots = if searched.is_empty() {
            "none".to_string()
        } else {
            searched
                .iter()
                .map(|r| r.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let message = format!(
            "module '{name}' is not available; allowed modules: {}; searched roots: {roots}",
            self.allowed.join(", ")
        );
        EvalAltResult::ErrorRuntime(Dynamic::from(message), pos).into()
    }

    fn find_file(&self, name: &str) -> Option<PathBuf> {
        let file = format!("{name}.rhai");
        self.search_path(name)
            .into_iter()
            .find_map(|root| locate(root, &file))
    }

    fn load_file(&self, engine: &Engine, path: &Path, pos: Position) -> Result<SharedModule, Box<EvalAltResult>> {
        let failed = |message: String| -> Box<EvalAltResult> {
            EvalAltResult::ErrorRuntime(Dynamic::from(message), pos).into()
        };
        let source = std::fs::read_to_string(path)
            .map_err(|e| failed(format!("cannot read module {}: {e}", path.display())))?;
        let mut ast = engine
            .compile(&source)
            .map_err(|e| failed(format!("cannot compile module {}: {e}", path.display())))?;
        ast.set_source(path.display().to_string());
        let module = Module::eval_ast_as_new(Scope::new(), &ast, engine)?;
        Ok(module.into())
    }
}

/// Rejects names that could leave the roots.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('\\')
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// The canonical path of `root/file` when it is a file that, with links
/// resolved, still lies under `root`.
fn locate(root: &Path, file: &str) -> Option<PathBuf> {
    let candidate = root.join(file);
    if !candidate.is_file() {
        return None;
    }
    let canonical_root = std::fs::canonicalize(root).ok()?;
    let canonical = std::fs::canonicalize(&candidate).ok()?;
    if canonical.starts_with(&canonical_root) {
        Some(canonical)
    } else {
        warn!(path = %candidate.display(), "Module resolves outside its root");
        None
    }
}

impl ModuleResolver for RestrictedModules {
    fn resolve(
        &self,
        engine: &Engine,
        _source: Option<&str>,
        path: &str,
        pos: Position,
    ) -> Result<SharedModule, Box<EvalAltResult>> {
        let name = path.strip_suffix(".rhai").unwrap_or(path);
        if !is_safe_name(name) {
            return Err(self.denied(name, pos));
        }

        if host::HOST_MODULES.contains(&name) {
            if !self.allowed.iter().any(|a| a == name) {
                return Err(self.denied(name, pos));
            }
            debug!(module = name, "Importing host module");
            return host::build(name, &self.collection_root)
                .map(SharedModule::from)
                .ok_or_else(|| self.denied(name, pos));
        }

        match self.find_file(name) {
            Some(file) => {
                debug!(module = name, path = %file.display(), "Importing script module");
                self.load_file(engine, &file, pos)
            }
            None => Err(self.denied(name, pos)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn import(modules: &RestrictedModules, name: &str) -> Result<SharedModule, Box<EvalAltResult>> {
        modules.resolve(&Engine::new(), None, name, Position::NONE)
    }

    #[test]
    fn fs_needs_filesystem_access() {
        let config = ScriptingConfig {
            module_whitelist: vec!["fs".into(), "lodash".into()],
            ..ScriptingConfig::default()
        };
        let modules = RestrictedModules::new(&config, Path::new("/c"));
        assert_eq!(
            modules.allowed(),
            ["json", "crypto", "encoding", "url", "time", "lodash"]
        );

        let config = ScriptingConfig {
            filesystem_access: true,
            ..ScriptingConfig::default()
        };
        assert!(RestrictedModules::new(&config, Path::new("/c")).allowed().contains(&"fs".to_string()));
    }

    #[test]
    fn traversal_is_rejected() {
        assert!(!is_safe_name("../secret"));
        assert!(!is_safe_name("/etc/passwd"));
        assert!(!is_safe_name("a\\b"));
        assert!(is_safe_name("lib/helpers"));
    }

    #[test]
    fn relative_roots_hang_off_the_collection() {
        let config = ScriptingConfig {
            additional_context_roots: vec!["lib".into(), "/abs".into()],
            ..ScriptingConfig::default()
        };
        let modules = RestrictedModules::new(&config, Path::new("/c"));
        assert_eq!(modules.roots, vec![PathBuf::from("/c/lib"), PathBuf::from("/abs")]);
    }

    #[test]
    fn whitelisted_packages_load_from_the_package_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(PACKAGE_DIR)).unwrap();
        std::fs::write(dir.path().join(PACKAGE_DIR).join("lodash.rhai"), "fn head(a) { a[0] }").unwrap();
        let config = ScriptingConfig {
            module_whitelist: vec!["lodash".into()],
            ..ScriptingConfig::default()
        };

        let mut engine = Engine::new();
        engine.set_module_resolver(RestrictedModules::new(&config, dir.path()));
        let head: rhai::INT = engine
            .eval(r#"import "lodash" as l; l::head([4, 5])"#)
            .unwrap();
        assert_eq!(head, 4);

        let refused = import(&RestrictedModules::new(&ScriptingConfig::default(), dir.path()), "lodash");
        assert!(refused.is_err());
    }

    #[test]
    fn missing_packages_name_the_package_dir() {
        let config = ScriptingConfig {
            module_whitelist: vec!["lodash".into()],
            ..ScriptingConfig::default()
        };
        let modules = RestrictedModules::new(&config, Path::new("/c"));

        let message = import(&modules, "lodash").unwrap_err().to_string();
        assert!(message.contains("searched roots: /c/modules"), "{message}");
    }

    #[test]
    fn unsafe_whitelist_entries_are_dropped() {
        let config = ScriptingConfig {
            module_whitelist: vec!["../escape".into(), "crypto".into()],
            ..ScriptingConfig::default()
        };
        let modules = RestrictedModules::new(&config, Path::new("/c"));
        assert_eq!(modules.allowed(), ["json", "crypto", "encoding", "url", "time"]);
    }

    #[cfg(unix)]
    #[test]
    fn links_out_of_a_root_are_not_followed() {
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.rhai"), "fn leak() { 1 }").unwrap();
        let collection = TempDir::new().unwrap();
        std::fs::create_dir(collection.path().join("lib")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.rhai"),
            collection.path().join("lib").join("secret.rhai"),
        )
        .unwrap();
        std::fs::write(collection.path().join("lib").join("inner.rhai"), "fn ok() { 1 }").unwrap();
        let config = ScriptingConfig {
            additional_context_roots: vec!["lib".into()],
            ..ScriptingConfig::default()
        };
        let modules = RestrictedModules::new(&config, collection.path());

        assert!(import(&modules, "secret").is_err());
        assert!(import(&modules, "inner").is_ok());
    }
}
