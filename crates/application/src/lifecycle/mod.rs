//! Request lifecycle orchestration.
//!
//! A request moves through a fixed sequence of stages, each recorded in the
//! [`RequestContext`]. Any stage error stops the sequence and becomes the
//! context's terminal error; the caller always gets the context back.

mod assertions;
mod build;
mod context;
mod interpolate;
mod orchestrator;
mod settings;

pub use assertions::{evaluate as evaluate_assertion, evaluate_all as evaluate_assertions};
pub use build::build_transport_request;
pub use context::RequestContext;
pub use interpolate::interpolate_request;
pub use orchestrator::{RunOptions, RunRequest};
pub use settings::{ComposedScripts, apply_collection_settings, merge_headers, resolve_auth};
