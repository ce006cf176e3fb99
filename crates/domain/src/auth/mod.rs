//! Authentication domain types

mod digest;
mod types;

pub use digest::{DigestAlgorithm, DigestChallenge, is_digest_challenge};
pub use types::{ApiKeyPlacement, AuthConfig};
