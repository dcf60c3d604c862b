//! Repository contract for blueprint persistence.

use async_trait::async_trait;
use blueprint_core::{Blueprint, BlueprintId, StoreResult};
use tokio_util::sync::CancellationToken;

/// Persistence operations for blueprints.
///
/// Each call is one round trip to the store. A missing row is `Ok(None)` (or
/// `Ok(false)` for delete), never an error. Cancelling `cancel` aborts the
/// in-flight operation with [`blueprint_core::StoreError::Cancelled`].
///
/// Implementations are shared process-wide and must be safe for concurrent use.
#[async_trait]
pub trait BlueprintRepository: Send + Sync {
    /// Look up a single blueprint by primary key.
    async fn get_by_id(
        &self,
        id: BlueprintId,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<Blueprint>>;

    /// One page of blueprints ordered by name ascending.
    async fn get_all(
        &self,
        limit: i64,
        offset: i64,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<Blueprint>>;

    /// Insert a blueprint and return the row as persisted.
    async fn create(&self, blueprint: &Blueprint, cancel: &CancellationToken)
        -> StoreResult<Blueprint>;

    /// Replace a blueprint by identifier. `None` if no row matched.
    async fn update(
        &self,
        blueprint: &Blueprint,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<Blueprint>>;

    /// Delete by identifier. `true` iff exactly one row was removed.
    async fn delete(&self, id: BlueprintId, cancel: &CancellationToken) -> StoreResult<bool>;

    /// Total number of blueprints.
    async fn count(&self, cancel: &CancellationToken) -> StoreResult<i64>;

    /// Liveness check. Never fails: any problem reaching the store is `false`.
    async fn health_check(&self, cancel: &CancellationToken) -> bool;
}
