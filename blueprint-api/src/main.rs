//! Blueprint Service Entry Point
//!
//! Loads configuration, prepares the PostgreSQL schema, and runs the gRPC
//! server alongside the HTTP health endpoints until interrupted.

use std::sync::Arc;

use blueprint_api::{
    create_router, create_server, spawn_idle_reaper, ApiError, ApiResult, BlueprintService,
    DefaultBlueprintService, HealthState, PgBlueprintRepository,
};
use blueprint_core::{DatabaseConfig, ServiceConfig, TraceContext};
use blueprint_storage::BlueprintRepository;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

use blueprint_api::telemetry::{init_tracer, TelemetryConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry = init_tracer(&TelemetryConfig::default())?;

    let service_config = ServiceConfig::from_env()?;
    service_config.validate()?;
    let db_config = DatabaseConfig::from_env()?;
    db_config.validate()?;

    let shutdown = CancellationToken::new();

    let repository = PgBlueprintRepository::from_config(&db_config, TraceContext::new("repository"))?;
    let reaper = spawn_idle_reaper(
        repository.pool().clone(),
        db_config.connection_idle_timeout,
        shutdown.clone(),
    );
    repository.ensure_schema(&shutdown).await?;

    let repository: Arc<dyn BlueprintRepository> = Arc::new(repository);
    let service: Arc<dyn BlueprintService> = Arc::new(DefaultBlueprintService::new(
        repository.clone(),
        TraceContext::new("service"),
    ));

    let grpc_addr = service_config.grpc_addr;
    let grpc = Server::builder()
        .timeout(service_config.request_timeout)
        .concurrency_limit_per_connection(service_config.max_concurrent_requests)
        .add_service(create_server(service, shutdown.clone()))
        .serve_with_shutdown(grpc_addr, shutdown.clone().cancelled_owned());

    let health_addr = service_config.health_addr;
    let listener = tokio::net::TcpListener::bind(health_addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", health_addr, e)))?;
    let health_router = create_router(HealthState::new(
        repository,
        service_config.service_name.clone(),
        shutdown.clone(),
    ));
    let health = axum::serve(listener, health_router)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned());

    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
        signal.cancel();
    });

    tracing::info!(
        %grpc_addr,
        %health_addr,
        service_name = %service_config.service_name,
        environment = %service_config.environment,
        "Starting Blueprint service"
    );

    let (grpc_result, health_result) = tokio::join!(grpc, health);
    shutdown.cancel();

    if let Err(e) = reaper.await {
        tracing::warn!(error = %e, "Idle connection reaper ended abnormally");
    }
    telemetry.shutdown();

    grpc_result.map_err(|e| ApiError::internal_error(format!("gRPC server error: {}", e)))?;
    health_result.map_err(|e| ApiError::internal_error(format!("Health server error: {}", e)))?;
    Ok(())
}
