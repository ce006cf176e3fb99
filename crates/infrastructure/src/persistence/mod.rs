//! File-based persistence: engine settings and response bodies.

mod body_store;
mod settings_repository;

pub use body_store::{ConfiguredBodyStore, FileBodyStore, MemoryBodyStore};
pub use settings_repository::{SettingsError, SettingsRepository};
