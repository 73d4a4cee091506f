//! Write path to the remote store

use crate::MutationError;
use aniverse_core::RecordId;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Writes rows to the remote store.
///
/// Implementations return the stored row (with its canonical id and
/// server-assigned columns) for creates and updates.
#[async_trait]
pub trait MutationClient: Send + Sync {
    /// Insert a row and return it as stored
    async fn create(&self, table: &str, row: Value) -> Result<Value, MutationError>;

    /// Patch a row and return it as stored
    async fn update(&self, table: &str, id: &RecordId, patch: Value)
        -> Result<Value, MutationError>;

    /// Delete a row
    async fn delete(&self, table: &str, id: &RecordId) -> Result<(), MutationError>;
}

#[async_trait]
impl<T: MutationClient + ?Sized> MutationClient for Arc<T> {
    async fn create(&self, table: &str, row: Value) -> Result<Value, MutationError> {
        (**self).create(table, row).await
    }

    async fn update(
        &self,
        table: &str,
        id: &RecordId,
        patch: Value,
    ) -> Result<Value, MutationError> {
        (**self).update(table, id, patch).await
    }

    async fn delete(&self, table: &str, id: &RecordId) -> Result<(), MutationError> {
        (**self).delete(table, id).await
    }
}

/// Bound a store call by `deadline`, reporting expiry as [`MutationError::Timeout`]
pub async fn with_timeout<T, F>(deadline: Duration, call: F) -> Result<T, MutationError>
where
    F: Future<Output = Result<T, MutationError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(MutationError::Timeout {
            after_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
