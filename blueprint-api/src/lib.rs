//! Blueprint API - gRPC service, PostgreSQL repository and health endpoints
//!
//! This crate hosts everything that touches the outside world: the Tonic
//! gRPC façade, the deadpool-postgres repository, the Axum health router and
//! the OpenTelemetry bootstrap. Business rules live in the service layer and
//! operate on any [`blueprint_storage::BlueprintRepository`].

pub mod db;
pub mod error;
pub mod grpc;
pub mod queries;
pub mod routes;
pub mod services;
pub mod telemetry;

// Re-export commonly used types
pub use db::{create_pool, spawn_idle_reaper, PgBlueprintRepository};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use grpc::{create_server, proto, BlueprintGrpcService};
pub use routes::{create_router, HealthState};
pub use services::{BlueprintService, DefaultBlueprintService};
