//! Relay Application - request lifecycle, transport and runs
//!
//! This crate drives a single request from collection settings to test
//! results, and sequences requests into collection runs:
//! - Port traits for the outside world (HTTP, scripts, body storage, clock, events)
//! - Variable interpolation
//! - The transport state machine (redirects, Digest, `SigV4`)
//! - The lifecycle orchestrator and collection runner

pub mod error;
pub mod lifecycle;
pub mod ports;
pub mod runner;
pub mod transport;
pub mod variable_resolver;

pub use error::{ApplicationError, ApplicationResult, LifecycleError};
pub use lifecycle::{RequestContext, RunOptions, RunRequest};
pub use ports::{
    BodyStoreError, CancellationToken, Clock, ConsoleSink, HttpSend, OutgoingRequest,
    RequestEvents, ResponseBodyStore, RunSummary, ScriptError, ScriptInvocation, ScriptRunner,
    TransportError,
};
pub use runner::{CollectionRunner, RunReport, RunTarget};
pub use transport::{TransportMachine, TransportRequest};
pub use variable_resolver::{InterpolationOptions, VariableResolver};
