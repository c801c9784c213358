use async_trait::async_trait;
use tracing::error;

use crate::error::StoreError;
use crate::settings::StatusCodes;
use crate::types::{Person, PersonResult};

/// Persistence boundary: loads pending persons and records what happened to them
#[async_trait]
pub trait PersonStore: Send {
    /// All persons flagged for an OFAC check
    async fn fetch_pending(&mut self) -> Result<Vec<Person>, StoreError>;

    /// Append one result row; `status_code` is the configured code for the result's status
    async fn record_outcome(&mut self, result: &PersonResult, status_code: &str) -> Result<(), StoreError>;

    async fn close(&mut self);
}

/// Write a result, marking it persisted. Single-statement failures are logged
/// and skipped; connection-level failures are returned.
pub async fn persist<S: PersonStore>(
    store: &mut S,
    codes: &StatusCodes,
    result: &mut PersonResult,
) -> Result<(), StoreError> {
    match store.record_outcome(result, codes.code(result.status)).await {
        Ok(()) => {
            result.persisted = true;
            Ok(())
        }
        Err(e) if !e.is_fatal() => {
            error!(person_id = %result.person_id, error = %e, "Failed to record result, skipping");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
