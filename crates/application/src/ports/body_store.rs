//! Response body persistence port

use std::future::Future;

use relay_domain::BodyLocation;
use thiserror::Error;

/// Error raised while persisting a response body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("could not persist response body: {0}")]
pub struct BodyStoreError(pub String);

/// Port for storing final response bodies, keyed by request uid.
pub trait ResponseBodyStore: Send + Sync {
    /// Stores `body` for `uid`, replacing any previous body.
    ///
    /// # Errors
    ///
    /// Returns `BodyStoreError` when the body cannot be written.
    fn persist(
        &self,
        uid: &str,
        body: &[u8],
    ) -> impl Future<Output = Result<BodyLocation, BodyStoreError>> + Send;
}
