//! Script execution infrastructure.
//!
//! [`RhaiSandbox`] implements the `ScriptRunner` port with a fresh Rhai
//! engine per run.

mod bridge;
mod console;
mod facades;
mod modules;
mod sandbox;
mod session;

pub use bridge::BigNumber;
pub use modules::DEFAULT_MODULES;
pub use sandbox::RhaiSandbox;
