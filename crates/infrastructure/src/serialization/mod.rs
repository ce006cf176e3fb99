//! JSON serialization for settings and persisted records.
//!
//! Output is stable across runs: 2-space indentation, declaration order for
//! struct fields, insertion order for maps, and a trailing newline.

mod json;

pub use json::*;
