//! Relay Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer: the reqwest transport, the Rhai
//! script sandbox, response body stores and engine settings.

pub mod adapters;
pub mod persistence;
pub mod scripting;
pub mod serialization;

pub use adapters::{ReqwestTransport, SystemClock};
pub use persistence::{
    ConfiguredBodyStore, FileBodyStore, MemoryBodyStore, SettingsError, SettingsRepository,
};
pub use scripting::RhaiSandbox;
pub use serialization::{
    SerializationError, from_json, from_json_bytes, to_json_stable, to_json_stable_bytes,
};
