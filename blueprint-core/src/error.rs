//! Error types for blueprint operations
//!
//! "Not found" is not an error here: a missing row is an `Option::None`, not a
//! failure. What remains is either the caller's fault ([`ValidationError`]) or
//! the store's ([`StoreError`]).

use std::time::Duration;
use thiserror::Error;

/// Client supplied invalid input. Never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Invalid blueprint ID format: {value}")]
    InvalidId { value: String },
}

/// Relational store failures, propagated unchanged up to the RPC boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Connection pool error: {reason}")]
    Pool { reason: String },

    #[error("Connection error: {reason}")]
    Connection { reason: String },

    #[error("Query failed: {reason}")]
    Query { reason: String },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("{operation} was cancelled")]
    Cancelled { operation: &'static str },
}

/// Configuration errors. Every violated rule is listed in one error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {}", .errors.join(", "))]
    InvalidService { errors: Vec<String> },

    #[error("Invalid database configuration: {}", .errors.join(", "))]
    InvalidDatabase { errors: Vec<String> },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Outcome of a failed service operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlueprintError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias for repository operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for service operations.
pub type BlueprintResult<T> = Result<T, BlueprintError>;

// =============================================================================
// TESTS
// =============================================================================
