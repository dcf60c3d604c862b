//! PostgreSQL Repository
//!
//! Connection pooling with deadpool-postgres and the `BlueprintRepository`
//! implementation over the `blueprints` table.
//!
//! Every call checks out one pooled connection, runs exactly one statement and
//! returns the connection when the guard drops. The whole round trip (checkout
//! included) is bounded by the configured command timeout and aborted when the
//! caller's cancellation token fires.
//!
//! An abandoned statement is cancelled on the server as well, and its
//! connection is discarded rather than returned to the pool. Sessions also
//! carry a `statement_timeout` equal to the command timeout.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use blueprint_core::mapper::{domain_to_entity, entity_to_domain};
use blueprint_core::{
    Blueprint, BlueprintEntity, BlueprintId, DatabaseConfig, StoreError, StoreResult, TraceContext,
};
use blueprint_storage::BlueprintRepository;
use deadpool_postgres::{
    Config, ManagerConfig, Object, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts,
};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_postgres::{NoTls, Row};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::queries;

// ============================================================================
// CONNECTION POOL
// ============================================================================

/// Pool settings for `config`. Sessions get a server-side
/// `statement_timeout` equal to the command timeout.
fn pool_config(config: &DatabaseConfig) -> Config {
    let mut cfg = Config::new();
    cfg.url = Some(config.connection_string.clone());
    cfg.options = Some(format!(
        "-c statement_timeout={}",
        config.command_timeout.as_millis()
    ));

    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let mut pool_cfg = PoolConfig::new(config.max_pool_size);
    pool_cfg.timeouts = Timeouts {
        wait: Some(config.command_timeout),
        create: Some(config.command_timeout),
        recycle: Some(config.command_timeout),
    };
    cfg.pool = Some(pool_cfg);
    cfg
}

/// Create a connection pool from validated database configuration.
///
/// No connection is opened here; the first checkout connects.
pub fn create_pool(config: &DatabaseConfig) -> StoreResult<Pool> {
    pool_config(config)
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| StoreError::Pool {
            reason: format!("Failed to create pool: {}", e),
        })
}

/// Evict pooled connections idle for longer than `idle_timeout`.
///
/// Runs until `shutdown` is cancelled.
pub fn spawn_idle_reaper(
    pool: Pool,
    idle_timeout: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let period = (idle_timeout / 2).clamp(Duration::from_secs(1), Duration::from_secs(60));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = pool
                        .retain(|_, metrics| metrics.last_used() < idle_timeout)
                        .removed
                        .len();
                    if evicted > 0 {
                        tracing::debug!(evicted, "Evicted idle database connections");
                    }
                }
            }
        }
        tracing::debug!("Idle connection reaper stopped");
    })
}

/// Classify a driver error. Errors reported by the server are query failures;
/// anything else means the connection itself is gone.
fn query_error(err: tokio_postgres::Error) -> StoreError {
    if err.as_db_error().is_some() || !err.is_closed() {
        StoreError::Query {
            reason: err.to_string(),
        }
    } else {
        StoreError::Connection {
            reason: err.to_string(),
        }
    }
}

fn pool_error(err: deadpool_postgres::PoolError) -> StoreError {
    match err {
        deadpool_postgres::PoolError::Backend(e) => StoreError::Connection {
            reason: e.to_string(),
        },
        other => StoreError::Pool {
            reason: other.to_string(),
        },
    }
}

fn row_to_entity(row: &Row) -> StoreResult<BlueprintEntity> {
    Ok(BlueprintEntity {
        id: row.try_get("id").map_err(query_error)?,
        name: row.try_get("name").map_err(query_error)?,
        description: row.try_get("description").map_err(query_error)?,
        created_at: row.try_get("created_at").map_err(query_error)?,
        updated_at: row.try_get("updated_at").map_err(query_error)?,
        metadata: row.try_get("metadata").map_err(query_error)?,
    })
}

// ============================================================================
// REPOSITORY
// ============================================================================

/// One statement against a checked-out connection.
type Statement<'c, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'c>>;

/// Blueprint repository backed by PostgreSQL.
#[derive(Clone)]
pub struct PgBlueprintRepository {
    pool: Pool,
    command_timeout: Duration,
    trace: TraceContext,
}

impl PgBlueprintRepository {
    pub fn new(pool: Pool, command_timeout: Duration, trace: TraceContext) -> Self {
        Self {
            pool,
            command_timeout,
            trace,
        }
    }

    /// Create the pool and repository from configuration.
    pub fn from_config(config: &DatabaseConfig, trace: TraceContext) -> StoreResult<Self> {
        let pool = create_pool(config)?;
        Ok(Self::new(pool, config.command_timeout, trace))
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Create the table and name index if they are missing.
    pub async fn ensure_schema(&self, cancel: &CancellationToken) -> StoreResult<()> {
        let span = self.trace.span("Repository.EnsureSchema");
        let result = self
            .run(span.operation(), cancel, |client| {
                Box::pin(async move {
                    client
                        .batch_execute(queries::CREATE_TABLE)
                        .await
                        .map_err(query_error)
                })
            })
            .instrument(span.span())
            .await;
        span.observe(result)
    }

    async fn client(&self) -> StoreResult<Object> {
        self.pool.get().await.map_err(pool_error)
    }

    fn timed_out(&self, operation: &'static str) -> StoreError {
        StoreError::Timeout {
            operation,
            timeout: self.command_timeout,
        }
    }

    /// Check out a connection and run one statement on it, racing both
    /// against the command timeout and `cancel`.
    async fn run<T, F>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        statement: F,
    ) -> StoreResult<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c Object) -> Statement<'c, T>,
    {
        let deadline = Instant::now() + self.command_timeout;

        let client = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StoreError::Cancelled { operation }),
            checkout = tokio::time::timeout_at(deadline, self.client()) => match checkout {
                Ok(client) => client?,
                Err(_) => return Err(self.timed_out(operation)),
            },
        };

        let abandoned = tokio::select! {
            biased;
            _ = cancel.cancelled() => StoreError::Cancelled { operation },
            result = tokio::time::timeout_at(deadline, statement(&client)) => match result {
                Ok(inner) => return inner,
                Err(_) => self.timed_out(operation),
            },
        };

        self.abort(operation, client).await;
        Err(abandoned)
    }

    /// Cancel the statement still running on `client`'s session and drop the
    /// connection instead of recycling it.
    async fn abort(&self, operation: &'static str, client: Object) {
        let cancel_token = client.cancel_token();
        match tokio::time::timeout(self.command_timeout, cancel_token.cancel_query(NoTls)).await {
            Ok(Ok(())) => tracing::debug!(operation, "Cancelled abandoned statement"),
            Ok(Err(e)) => {
                tracing::warn!(operation, error = %e, "Failed to cancel abandoned statement")
            }
            Err(_) => tracing::warn!(operation, "Timed out cancelling abandoned statement"),
        }
        drop(Object::take(client));
    }
}

#[async_trait]
impl BlueprintRepository for PgBlueprintRepository {
    async fn get_by_id(
        &self,
        id: BlueprintId,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<Blueprint>> {
        let span = self.trace.span("Repository.GetById");
        span.record_id(&id);

        let result = self
            .run(span.operation(), cancel, move |client| {
                Box::pin(async move {
                    let row = client
                        .query_opt(queries::GET_BY_ID, &[&id])
                        .await
                        .map_err(query_error)?;
                    row.as_ref().map(row_to_entity).transpose()
                })
            })
            .instrument(span.span())
            .await;

        span.observe(result.map(|entity| entity.map(entity_to_domain)))
    }

    async fn get_all(
        &self,
        limit: i64,
        offset: i64,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<Blueprint>> {
        let span = self.trace.span("Repository.GetAll");
        span.record_page(limit, offset);

        let result = self
            .run(span.operation(), cancel, move |client| {
                Box::pin(async move {
                    let rows = client
                        .query(queries::GET_ALL, &[&limit, &offset])
                        .await
                        .map_err(query_error)?;
                    rows.iter().map(row_to_entity).collect::<StoreResult<Vec<_>>>()
                })
            })
            .instrument(span.span())
            .await;

        span.observe(result.map(|entities| entities.into_iter().map(entity_to_domain).collect()))
    }

    async fn create(
        &self,
        blueprint: &Blueprint,
        cancel: &CancellationToken,
    ) -> StoreResult<Blueprint> {
        let span = self.trace.span("Repository.Create");
        span.record_id(&blueprint.id);
        let entity = domain_to_entity(blueprint);

        let result = self
            .run(span.operation(), cancel, move |client| {
                Box::pin(async move {
                    let row = client
                        .query_one(
                            queries::INSERT,
                            &[
                                &entity.id,
                                &entity.name,
                                &entity.description,
                                &entity.created_at,
                                &entity.updated_at,
                                &entity.metadata,
                            ],
                        )
                        .await
                        .map_err(query_error)?;
                    row_to_entity(&row)
                })
            })
            .instrument(span.span())
            .await;

        span.observe(result.map(entity_to_domain))
    }

    async fn update(
        &self,
        blueprint: &Blueprint,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<Blueprint>> {
        let span = self.trace.span("Repository.Update");
        span.record_id(&blueprint.id);
        let entity = domain_to_entity(blueprint);

        let result = self
            .run(span.operation(), cancel, move |client| {
                Box::pin(async move {
                    let row = client
                        .query_opt(
                            queries::UPDATE,
                            &[
                                &entity.id,
                                &entity.name,
                                &entity.description,
                                &entity.updated_at,
                                &entity.metadata,
                            ],
                        )
                        .await
                        .map_err(query_error)?;
                    row.as_ref().map(row_to_entity).transpose()
                })
            })
            .instrument(span.span())
            .await;

        span.observe(result.map(|entity| entity.map(entity_to_domain)))
    }

    async fn delete(&self, id: BlueprintId, cancel: &CancellationToken) -> StoreResult<bool> {
        let span = self.trace.span("Repository.Delete");
        span.record_id(&id);

        let result = self
            .run(span.operation(), cancel, move |client| {
                Box::pin(async move {
                    client
                        .execute(queries::DELETE, &[&id])
                        .await
                        .map_err(query_error)
                })
            })
            .instrument(span.span())
            .await;

        span.observe(result.map(|removed| removed == 1))
    }

    async fn count(&self, cancel: &CancellationToken) -> StoreResult<i64> {
        let span = self.trace.span("Repository.Count");

        let result = self
            .run(span.operation(), cancel, |client| {
                Box::pin(async move {
                    let row = client
                        .query_one(queries::COUNT, &[])
                        .await
                        .map_err(query_error)?;
                    row.try_get::<_, i64>(0).map_err(query_error)
                })
            })
            .instrument(span.span())
            .await;

        span.observe(result)
    }

    async fn health_check(&self, cancel: &CancellationToken) -> bool {
        let span = self.trace.span("Repository.HealthCheck");

        let result = self
            .run(span.operation(), cancel, |client| {
                Box::pin(async move {
                    let row = client
                        .query_one(queries::HEALTH_CHECK, &[])
                        .await
                        .map_err(query_error)?;
                    row.try_get::<_, i32>(0).map_err(query_error)
                })
            })
            .instrument(span.span())
            .await;

        match span.observe(result) {
            Ok(value) => value == 1,
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                false
            }
        }
    }
}


/// Abandoned statements against a live PostgreSQL (`BLUEPRINT_DB_URL`).
#[cfg(all(test, feature = "db-tests"))]
mod abort_tests {
    use super::*;

    /// Repository whose client-side timeout is far below the session
    /// `statement_timeout`, so only the client deadline can fire.
    fn live_repo(command_timeout: Duration) -> StoreResult<PgBlueprintRepository> {
        let url = std::env::var("BLUEPRINT_DB_URL").map_err(|_| StoreError::Connection {
            reason: "BLUEPRINT_DB_URL is not set".to_string(),
        })?;
        let pool = create_pool(&DatabaseConfig::new(url).with_command_timeout(Duration::from_secs(30)))?;
        Ok(PgBlueprintRepository::new(
            pool,
            command_timeout,
            TraceContext::new("repository"),
        ))
    }

    #[tokio::test]
    async fn test_timed_out_statement_discards_connection() -> StoreResult<()> {
        let repo = live_repo(Duration::from_millis(300))?;
        let cancel = CancellationToken::new();
        assert!(repo.health_check(&cancel).await);
        assert_eq!(repo.pool().status().size, 1);

        let result: StoreResult<()> = repo
            .run("Repository.Sleep", &cancel, |client| {
                Box::pin(async move {
                    client
                        .batch_execute("SELECT pg_sleep(5)")
                        .await
                        .map_err(query_error)
                })
            })
            .await;
        assert_eq!(
            result,
            Err(StoreError::Timeout {
                operation: "Repository.Sleep",
                timeout: Duration::from_millis(300),
            })
        );
        assert_eq!(repo.pool().status().size, 0);

        assert!(repo.health_check(&cancel).await);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_statement_discards_connection() -> StoreResult<()> {
        let repo = live_repo(Duration::from_secs(10))?;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result: StoreResult<()> = repo
            .run("Repository.Sleep", &cancel, |client| {
                Box::pin(async move {
                    client
                        .batch_execute("SELECT pg_sleep(5)")
                        .await
                        .map_err(query_error)
                })
            })
            .await;
        assert_eq!(
            result,
            Err(StoreError::Cancelled {
                operation: "Repository.Sleep"
            })
        );
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(repo.pool().status().size, 0);
        Ok(())
    }
}
