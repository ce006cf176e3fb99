//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the request execution core and the
//! outside world. Adapters in the infrastructure layer implement them.

mod body_store;
mod clock;
mod events;
mod http_send;
mod script_runner;

pub use body_store::{BodyStoreError, ResponseBodyStore};
pub use clock::{Clock, FixedClock};
pub use events::{GatedEvents, NoopEvents, RequestEvents, RunSummary};
pub use http_send::{CancellationToken, HttpSend, OutgoingRequest, TransportError};
pub use script_runner::{ConsoleSink, ScriptError, ScriptInvocation, ScriptRunner, discard_console};
