//! Bounded calls into the grant store and membership provider.
//!
//! Every upstream call runs under the configured timeout. A call that times
//! out or reports the upstream unavailable is recorded as a [`Degradation`]
//! and contributes nothing; the evaluation carries on without it.

use std::future::Future;
use std::time::Duration;

use folio_core::error::FolioResult;
use folio_core::models::grant::{Degradation, Lookup};
use tracing::warn;

use crate::error::AccessError;

/// Run `fut` with an upper bound of `limit`.
pub async fn bounded<T>(
    limit: Duration,
    lookup: Lookup,
    fut: impl Future<Output = FolioResult<T>>,
) -> FolioResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AccessError::Timeout { lookup }.into()),
    }
}

/// Degradations collected while evaluating one request.
#[derive(Debug, Default)]
pub struct Warnings(Vec<Degradation>);

impl Warnings {
    pub fn new(initial: Vec<Degradation>) -> Self {
        Self(initial)
    }

    /// Pass a successful answer through. An upstream failure becomes a
    /// warning and an empty answer; any other error propagates.
    pub fn absorb<T: Default>(&mut self, lookup: Lookup, result: FolioResult<T>) -> FolioResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) if err.is_upstream() => {
                warn!(
                    lookup = lookup.as_str(),
                    error = %err,
                    "Evaluating without upstream answer"
                );
                self.0.push(Degradation {
                    lookup,
                    reason: err.to_string(),
                });
                Ok(T::default())
            }
            Err(err) => Err(err),
        }
    }

    pub fn extend(&mut self, more: impl IntoIterator<Item = Degradation>) {
        self.0.extend(more);
    }

    pub fn into_vec(self) -> Vec<Degradation> {
        self.0
    }
}
