//! Blueprint Core - Data Model and Mapping
//!
//! Record shapes for the three layers a blueprint passes through (storage row,
//! domain object, wire response), the pure mapping functions between them,
//! the error taxonomy shared by every crate, and configuration types.
//!
//! This crate performs no I/O.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod config;
pub mod error;
pub mod mapper;
pub mod model;
pub mod trace;

pub use config::{DatabaseConfig, ServiceConfig};
pub use error::{
    BlueprintError, BlueprintResult, ConfigError, StoreError, StoreResult, ValidationError,
};
pub use model::{
    Blueprint, BlueprintEntity, BlueprintMetadata, BlueprintResponse, CreateBlueprintRequest,
    UpdateBlueprintRequest, DEFAULT_METADATA_VERSION,
};
pub use trace::{OperationSpan, TraceContext};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Blueprint identifier. Server-generated, random (v4).
pub type BlueprintId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a fresh random blueprint identifier.
pub fn new_blueprint_id() -> BlueprintId {
    Uuid::new_v4()
}

/// Parse a textual identifier as it arrives on the wire.
///
/// The offending literal is kept in the error so callers can echo it back.
pub fn parse_blueprint_id(value: &str) -> Result<BlueprintId, ValidationError> {
    Uuid::parse_str(value).map_err(|_| ValidationError::InvalidId {
        value: value.to_string(),
    })
}
