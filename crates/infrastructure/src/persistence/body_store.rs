//! Response body stores.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use relay_application::ports::{BodyStoreError, ResponseBodyStore};
use relay_domain::{BodyLocation, EngineSettings};
use tokio::fs;
use tracing::debug;

/// Writes each final body to `<dir>/<uid>.body`.
#[derive(Debug, Clone)]
pub struct FileBodyStore {
    dir: PathBuf,
}

impl FileBodyStore {
    /// Creates a store rooted at `dir`; the directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, uid: &str) -> Result<PathBuf, BodyStoreError> {
        let valid = !uid.is_empty()
            && uid
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(BodyStoreError(format!("invalid request uid '{uid}'")));
        }
        Ok(self.dir.join(format!("{uid}.body")))
    }
}

impl ResponseBodyStore for FileBodyStore {
    async fn persist(&self, uid: &str, body: &[u8]) -> Result<BodyLocation, BodyStoreError> {
        let path = self.path_for(uid)?;
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BodyStoreError(e.to_string()))?;
        fs::write(&path, body)
            .await
            .map_err(|e| BodyStoreError(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), bytes = body.len(), "Persisted response body");
        Ok(BodyLocation::File {
            path: path.display().to_string(),
        })
    }
}

/// Keeps bodies in memory, keyed by request uid.
#[derive(Debug, Clone, Default)]
pub struct MemoryBodyStore {
    bodies: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBodyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The body stored for `uid`.
    #[must_use]
    pub fn get(&self, uid: &str) -> Option<Vec<u8>> {
        self.bodies
            .lock()
            .ok()
            .and_then(|bodies| bodies.get(uid).cloned())
    }
}

impl ResponseBodyStore for MemoryBodyStore {
    async fn persist(&self, uid: &str, body: &[u8]) -> Result<BodyLocation, BodyStoreError> {
        self.bodies
            .lock()
            .map_err(|e| BodyStoreError(e.to_string()))?
            .insert(uid.to_string(), body.to_vec());
        Ok(BodyLocation::Memory {
            key: uid.to_string(),
        })
    }
}

/// The store selected by [`EngineSettings::response_dir`].
#[derive(Debug, Clone)]
pub enum ConfiguredBodyStore {
    /// Bodies written under the configured directory.
    File(FileBodyStore),
    /// No directory configured.
    Memory(MemoryBodyStore),
}

impl ConfiguredBodyStore {
    /// Picks a file store when a response directory is set, memory otherwise.
    #[must_use]
    pub fn from_settings(settings: &EngineSettings) -> Self {
        settings.response_dir.as_ref().map_or_else(
            || Self::Memory(MemoryBodyStore::new()),
            |dir| Self::File(FileBodyStore::new(dir)),
        )
    }
}

impl ResponseBodyStore for ConfiguredBodyStore {
    async fn persist(&self, uid: &str, body: &[u8]) -> Result<BodyLocation, BodyStoreError> {
        match self {
            Self::File(store) => store.persist(uid, body).await,
            Self::Memory(store) => store.persist(uid, body).await,
        }
    }
}
