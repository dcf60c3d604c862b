//! HTTP routes served beside the gRPC endpoint.

pub mod health;

pub use health::{create_router, HealthState};
