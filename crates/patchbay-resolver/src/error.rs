//! Resolver error types.

use std::time::Duration;

use patchbay_core::error::{PatchbayError, PatchbayResult};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("store lookup failed: {0}")]
    Store(#[from] PatchbayError),

    #[error("store lookup '{operation}' timed out after {budget:?}")]
    StoreTimeout {
        operation: &'static str,
        budget: Duration,
    },
}

pub type ResolverResult<T> = Result<T, ResolverError>;

/// Run a store read under the configured budget.
///
/// The dialplan path treats an elapsed budget like a store failure
/// (standard error program), never as a hang.
pub(crate) async fn with_store_timeout<T>(
    budget: Duration,
    operation: &'static str,
    fut: impl Future<Output = PatchbayResult<T>>,
) -> ResolverResult<T> {
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            warn!(operation, ?budget, "store read exceeded its budget");
            Err(ResolverError::StoreTimeout { operation, budget })
        }
    }
}
