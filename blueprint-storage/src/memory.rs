//! In-memory repository for tests and local development.
//!
//! Rows are held in their storage shape and pass through the same mapper as
//! the PostgreSQL repository, so metadata fallback behaves identically.
//! Failure injection and a call counter let tests assert on store traffic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use blueprint_core::mapper::{domain_to_entity, entity_to_domain};
use blueprint_core::{Blueprint, BlueprintEntity, BlueprintId, StoreError, StoreResult};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::BlueprintRepository;

/// In-memory blueprint table.
#[derive(Debug, Default)]
pub struct InMemoryBlueprintRepository {
    rows: RwLock<HashMap<BlueprintId, BlueprintEntity>>,
    failure: RwLock<Option<StoreError>>,
    calls: AtomicUsize,
    unhealthy: AtomicBool,
}

impl InMemoryBlueprintRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store calls made so far (health checks excluded).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with `error` until [`Self::clear_failure`].
    pub async fn fail_with(&self, error: StoreError) {
        *self.failure.write().await = Some(error);
    }

    pub async fn clear_failure(&self) {
        *self.failure.write().await = None;
    }

    /// Simulate an unreachable store for health checks.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unhealthy.store(unreachable, Ordering::SeqCst);
    }

    /// Insert a raw row, bypassing the mapper (e.g. to seed corrupt metadata).
    pub async fn insert_entity(&self, entity: BlueprintEntity) {
        self.rows.write().await.insert(entity.id, entity);
    }

    async fn begin(&self, operation: &'static str, cancel: &CancellationToken) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled { operation });
        }
        match self.failure.read().await.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BlueprintRepository for InMemoryBlueprintRepository {
    async fn get_by_id(
        &self,
        id: BlueprintId,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<Blueprint>> {
        self.begin("Repository.GetById", cancel).await?;
        let rows = self.rows.read().await;
        Ok(rows.get(&id).cloned().map(entity_to_domain))
    }

    async fn get_all(
        &self,
        limit: i64,
        offset: i64,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<Blueprint>> {
        self.begin("Repository.GetAll", cancel).await?;
        if limit < 0 {
            return Err(StoreError::Query {
                reason: "LIMIT must not be negative".to_string(),
            });
        }
        if offset < 0 {
            return Err(StoreError::Query {
                reason: "OFFSET must not be negative".to_string(),
            });
        }

        let rows = self.rows.read().await;
        let mut entities: Vec<&BlueprintEntity> = rows.values().collect();
        entities.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        Ok(entities
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .map(entity_to_domain)
            .collect())
    }

    async fn create(
        &self,
        blueprint: &Blueprint,
        cancel: &CancellationToken,
    ) -> StoreResult<Blueprint> {
        self.begin("Repository.Create", cancel).await?;
        let mut rows = self.rows.write().await;
        if rows.contains_key(&blueprint.id) {
            return Err(StoreError::Query {
                reason: format!(
                    "duplicate key value violates unique constraint \"blueprints_pkey\": {}",
                    blueprint.id
                ),
            });
        }
        let entity = domain_to_entity(blueprint);
        rows.insert(entity.id, entity.clone());
        Ok(entity_to_domain(entity))
    }

    async fn update(
        &self,
        blueprint: &Blueprint,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<Blueprint>> {
        self.begin("Repository.Update", cancel).await?;
        let mut rows = self.rows.write().await;
        let Some(row) = rows.get_mut(&blueprint.id) else {
            return Ok(None);
        };

        // created_at is not part of the update statement
        let entity = domain_to_entity(blueprint);
        row.name = entity.name;
        row.description = entity.description;
        row.updated_at = entity.updated_at;
        row.metadata = entity.metadata;

        Ok(Some(entity_to_domain(row.clone())))
    }

    async fn delete(&self, id: BlueprintId, cancel: &CancellationToken) -> StoreResult<bool> {
        self.begin("Repository.Delete", cancel).await?;
        Ok(self.rows.write().await.remove(&id).is_some())
    }

    async fn count(&self, cancel: &CancellationToken) -> StoreResult<i64> {
        self.begin("Repository.Count", cancel).await?;
        let len = self.rows.read().await.len();
        Ok(i64::try_from(len).unwrap_or(i64::MAX))
    }

    async fn health_check(&self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() || self.unhealthy.load(Ordering::SeqCst) {
            return false;
        }
        if self.failure.read().await.is_some() {
            tracing::debug!("In-memory health check reporting failure injection");
            return false;
        }
        true
    }
}

// =============================================================================
// TESTS
// =============================================================================
