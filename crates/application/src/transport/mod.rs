//! HTTP transport state machine.
//!
//! `Prepare → Send → Classify → {Redirect | DigestChallenge | Final}`.
//! Redirects are followed up to a cap, a Digest challenge is answered at
//! most once, and AWS SigV4 signatures are recomputed for every send.

mod body;
mod digest;
mod machine;
mod request;
mod signing;

pub use body::{EncodedBody, encode_body};
pub use digest::{authorization_header as digest_authorization, generate_cnonce};
pub use machine::TransportMachine;
pub use request::{AwsCredentials, TransportAuth, TransportRequest};
pub use signing::sign_request;
