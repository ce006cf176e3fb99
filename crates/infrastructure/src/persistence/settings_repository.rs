//! Engine settings persistence.
//!
//! By default settings live in the platform config directory:
//! - Linux: ~/.config/relay/engine.json
//! - macOS: ~/Library/Application Support/relay/engine.json
//! - Windows: %APPDATA%/relay/engine.json

use std::path::{Path, PathBuf};

use relay_domain::EngineSettings;
use tokio::fs;
use tracing::debug;

use crate::serialization::{SerializationError, from_json_bytes, to_json_stable_bytes};

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Could not determine config directory.
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Repository for `EngineSettings`.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    path: Option<PathBuf>,
}

impl Default for SettingsRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsRepository {
    /// Uses the platform config directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: dirs::config_dir().map(|p| p.join("relay").join("engine.json")),
        }
    }

    /// Uses an explicit settings file.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// The settings file, if a location is known.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Loads settings, falling back to defaults when the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<EngineSettings, SettingsError> {
        let Some(path) = &self.path else {
            return Ok(EngineSettings::default());
        };

        match fs::read(path).await {
            Ok(content) => Ok(from_json_bytes(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file, using defaults");
                Ok(EngineSettings::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Saves settings, creating the parent directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no location is known or the write fails.
    pub async fn save(&self, settings: &EngineSettings) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Err(SettingsError::NoConfigDir);
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, to_json_stable_bytes(settings)?).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn default_path_ends_with_engine_json() {
        if let Some(p) = SettingsRepository::new().path() {
            assert!(p.ends_with("relay/engine.json"));
        }
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let repo = SettingsRepository::at(dir.path().join("engine.json"));
        assert_eq!(repo.load().await.unwrap(), EngineSettings::default());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let repo = SettingsRepository::at(dir.path().join("nested").join("engine.json"));
        let settings = EngineSettings {
            default_max_redirects: 3,
            default_timeout_ms: Some(1500),
            ..EngineSettings::default()
        };

        repo.save(&settings).await.unwrap();

        assert_eq!(repo.load().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn partial_files_fill_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"scriptTimeoutMs": 250}"#).unwrap();

        let settings = SettingsRepository::at(&path).load().await.unwrap();

        assert_eq!(settings.script_timeout_ms, 250);
        assert_eq!(settings.default_max_redirects, 25);
    }

    #[tokio::test]
    async fn corrupt_files_are_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, "not json").unwrap();

        let result = SettingsRepository::at(&path).load().await;

        assert!(matches!(result, Err(SettingsError::Serialization(_))));
    }
}
