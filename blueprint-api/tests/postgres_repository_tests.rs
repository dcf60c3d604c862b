#![cfg(feature = "db-tests")]
//! Repository Tests Against a Live PostgreSQL
//!
//! Enabled with `--features db-tests`; reads `BLUEPRINT_DB_URL`. The
//! `blueprints` table is emptied, so point it at a disposable database.
//! Scenarios run sequentially inside one test because they share the table.

use std::time::Duration;

use blueprint_api::{create_pool, PgBlueprintRepository};
use blueprint_core::{
    mapper::create_request_to_domain, new_blueprint_id, BlueprintMetadata, DatabaseConfig,
    StoreError, StoreResult, TraceContext,
};
use blueprint_storage::BlueprintRepository;
use blueprint_test_utils::fixtures;
use tokio_util::sync::CancellationToken;

fn test_config() -> StoreResult<DatabaseConfig> {
    let url = std::env::var("BLUEPRINT_DB_URL").map_err(|_| StoreError::Connection {
        reason: "BLUEPRINT_DB_URL is not set".to_string(),
    })?;
    Ok(DatabaseConfig::new(url).with_max_pool_size(4))
}

fn test_repository() -> StoreResult<PgBlueprintRepository> {
    PgBlueprintRepository::from_config(&test_config()?, TraceContext::new("repository"))
}

/// Client-side deadline of `command_timeout`; the session statement timeout
/// stays at the configured 30 s so only the repository can give up.
fn impatient_repository(command_timeout: Duration) -> StoreResult<PgBlueprintRepository> {
    let pool = create_pool(&test_config()?)?;
    Ok(PgBlueprintRepository::new(
        pool,
        command_timeout,
        TraceContext::new("repository"),
    ))
}

fn query_failed(e: impl std::fmt::Display) -> StoreError {
    StoreError::Query {
        reason: e.to_string(),
    }
}

async fn reset(repo: &PgBlueprintRepository, cancel: &CancellationToken) -> StoreResult<()> {
    repo.ensure_schema(cancel).await?;
    let client = repo.pool().get().await.map_err(|e| StoreError::Pool {
        reason: e.to_string(),
    })?;
    client
        .batch_execute("DELETE FROM blueprints")
        .await
        .map_err(|e| StoreError::Query {
            reason: e.to_string(),
        })
}

async fn crud_scenario(repo: &PgBlueprintRepository, cancel: &CancellationToken) -> StoreResult<()> {
    let blueprint = create_request_to_domain(fixtures::tagged_create_request(
        "alpha",
        "platform",
        &["infra", "core"],
    ));

    let created = repo.create(&blueprint, cancel).await?;
    assert_eq!(created.id, blueprint.id);
    assert_eq!(created.metadata, blueprint.metadata);
    assert_eq!(created.created_at, created.updated_at);

    let fetched = repo.get_by_id(blueprint.id, cancel).await?;
    assert_eq!(fetched, Some(created.clone()));

    let mut replacement = created.clone();
    replacement.name = "beta".to_string();
    replacement.metadata = BlueprintMetadata::default();
    replacement.updated_at = chrono::Utc::now();
    let updated = repo.update(&replacement, cancel).await?;
    let Some(updated) = updated else {
        panic!("existing row was not updated");
    };
    assert_eq!(updated.name, "beta");
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);

    let mut ghost = replacement.clone();
    ghost.id = new_blueprint_id();
    assert_eq!(repo.update(&ghost, cancel).await?, None);

    assert!(repo.delete(blueprint.id, cancel).await?);
    assert!(!repo.delete(blueprint.id, cancel).await?);
    assert_eq!(repo.get_by_id(blueprint.id, cancel).await?, None);
    Ok(())
}

async fn paging_scenario(repo: &PgBlueprintRepository, cancel: &CancellationToken) -> StoreResult<()> {
    for name in ["delta", "alpha", "charlie", "bravo"] {
        let blueprint = create_request_to_domain(fixtures::create_request(name));
        repo.create(&blueprint, cancel).await?;
    }

    let names = |rows: Vec<blueprint_core::Blueprint>| {
        rows.into_iter().map(|b| b.name).collect::<Vec<_>>()
    };
    assert_eq!(names(repo.get_all(2, 0, cancel).await?), vec!["alpha", "bravo"]);
    assert_eq!(names(repo.get_all(2, 2, cancel).await?), vec!["charlie", "delta"]);
    assert!(repo.get_all(2, 4, cancel).await?.is_empty());
    assert_eq!(repo.count(cancel).await?, 4);
    Ok(())
}

async fn tied_names_scenario(repo: &PgBlueprintRepository, cancel: &CancellationToken) -> StoreResult<()> {
    let mut ids = Vec::new();
    for _ in 0..5 {
        let blueprint = create_request_to_domain(fixtures::create_request("same"));
        ids.push(repo.create(&blueprint, cancel).await?.id);
    }
    ids.sort();

    let mut paged = Vec::new();
    for offset in 0..5 {
        paged.extend(repo.get_all(1, offset, cancel).await?.into_iter().map(|b| b.id));
    }
    assert_eq!(paged, ids);
    Ok(())
}

/// Holds a row lock while an update waits on it, then checks the abandoned
/// update never lands once the lock is released.
async fn abandoned_update_scenario(
    repo: &PgBlueprintRepository,
    cancel: &CancellationToken,
    abandon: &CancellationToken,
    impatient: &PgBlueprintRepository,
) -> StoreResult<StoreError> {
    let blueprint = create_request_to_domain(fixtures::create_request("before"));
    repo.create(&blueprint, cancel).await?;

    let locker = repo.pool().get().await.map_err(|e| StoreError::Pool {
        reason: e.to_string(),
    })?;
    locker.batch_execute("BEGIN").await.map_err(query_failed)?;
    locker
        .query(
            "SELECT id FROM blueprints WHERE id = $1 FOR UPDATE",
            &[&blueprint.id],
        )
        .await
        .map_err(query_failed)?;

    let mut renamed = blueprint.clone();
    renamed.name = "after".to_string();
    renamed.updated_at = chrono::Utc::now();
    let err = impatient.update(&renamed, abandon).await.unwrap_err();

    locker.batch_execute("ROLLBACK").await.map_err(query_failed)?;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let stored = repo.get_by_id(blueprint.id, cancel).await?;
    assert_eq!(stored.map(|b| b.name), Some("before".to_string()));
    Ok(err)
}


async fn wrong_shape_metadata_scenario(
    repo: &PgBlueprintRepository,
    cancel: &CancellationToken,
) -> StoreResult<()> {
    let id = new_blueprint_id();
    let client = repo.pool().get().await.map_err(|e| StoreError::Pool {
        reason: e.to_string(),
    })?;
    client
        .execute(
            "INSERT INTO blueprints (id, name, description, created_at, updated_at, metadata) \
             VALUES ($1, 'odd', '', now(), now(), '[1, 2, 3]'::jsonb)",
            &[&id],
        )
        .await
        .map_err(|e| StoreError::Query {
            reason: e.to_string(),
        })?;

    let fetched = repo.get_by_id(id, cancel).await?;
    assert_eq!(fetched.map(|b| b.metadata), Some(BlueprintMetadata::default()));
    Ok(())
}

#[tokio::test]
async fn test_repository_against_postgres() -> StoreResult<()> {
    let repo = test_repository()?;
    let cancel = CancellationToken::new();

    assert!(repo.health_check(&cancel).await);

    reset(&repo, &cancel).await?;
    crud_scenario(&repo, &cancel).await?;

    reset(&repo, &cancel).await?;
    paging_scenario(&repo, &cancel).await?;

    reset(&repo, &cancel).await?;
    tied_names_scenario(&repo, &cancel).await?;

    reset(&repo, &cancel).await?;
    wrong_shape_metadata_scenario(&repo, &cancel).await?;

    reset(&repo, &cancel).await?;
    let impatient = impatient_repository(Duration::from_millis(300))?;
    let err = abandoned_update_scenario(&repo, &cancel, &CancellationToken::new(), &impatient).await?;
    assert_eq!(
        err,
        StoreError::Timeout {
            operation: "Repository.Update",
            timeout: Duration::from_millis(300),
        }
    );

    reset(&repo, &cancel).await?;
    let patient = impatient_repository(Duration::from_secs(30))?;
    let abandon = CancellationToken::new();
    let trigger = abandon.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });
    let err = abandoned_update_scenario(&repo, &cancel, &abandon, &patient).await?;
    assert_eq!(
        err,
        StoreError::Cancelled {
            operation: "Repository.Update"
        }
    );

    reset(&repo, &cancel).await
}
