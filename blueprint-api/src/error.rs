//! Error Types for the Blueprint API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - Conversions from the core error taxonomy and into `tonic::Status`
//! - IntoResponse implementation for the Axum health router
//!
//! Server-side failures are logged in full and reach callers only as a
//! generic internal error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use blueprint_core::{BlueprintError, ConfigError, StoreError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tonic::{Code, Status};

/// Message returned to callers for every server-side failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each code maps to a gRPC status code and an HTTP status code. Codes that
/// describe the caller's mistake are client-visible; everything else is a
/// server-side failure whose detail is only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// Request validation failed (e.g. empty name)
    ValidationFailed,

    /// Field format is incorrect (e.g. malformed identifier)
    InvalidFormat,

    /// Field value is out of valid range (e.g. page number below 1)
    InvalidRange,

    // ========================================================================
    // Not Found Errors
    // ========================================================================
    /// Requested entity does not exist
    EntityNotFound,

    // ========================================================================
    // Caller-initiated
    // ========================================================================
    /// The caller cancelled the request or the server is shutting down
    Cancelled,

    // ========================================================================
    // Server Errors
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Database operation failed
    DatabaseError,

    /// Database connection could not be established
    ServiceUnavailable,

    /// Database connection pool exhausted
    ConnectionPoolExhausted,

    /// Operation timed out
    Timeout,

    /// Startup configuration is invalid
    ConfigurationInvalid,
}

impl ErrorCode {
    /// Get the gRPC status code for this error code.
    pub fn grpc_code(&self) -> Code {
        match self {
            ErrorCode::ValidationFailed | ErrorCode::InvalidFormat | ErrorCode::InvalidRange => {
                Code::InvalidArgument
            }
            ErrorCode::EntityNotFound => Code::NotFound,
            ErrorCode::Cancelled => Code::Cancelled,
            ErrorCode::ServiceUnavailable | ErrorCode::ConnectionPoolExhausted => Code::Unavailable,
            ErrorCode::Timeout => Code::DeadlineExceeded,
            ErrorCode::InternalError
            | ErrorCode::DatabaseError
            | ErrorCode::ConfigurationInvalid => Code::Internal,
        }
    }

    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed | ErrorCode::InvalidFormat | ErrorCode::InvalidRange => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,
            ErrorCode::Cancelled
            | ErrorCode::ServiceUnavailable
            | ErrorCode::ConnectionPoolExhausted => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::InternalError
            | ErrorCode::DatabaseError
            | ErrorCode::ConfigurationInvalid => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the message may be shown to the caller verbatim.
    pub fn is_client_visible(&self) -> bool {
        matches!(
            self,
            ErrorCode::ValidationFailed
                | ErrorCode::InvalidFormat
                | ErrorCode::InvalidRange
                | ErrorCode::EntityNotFound
                | ErrorCode::Cancelled
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFormat, message)
    }

    /// Create an InvalidRange error.
    pub fn invalid_range(field: &str, requirement: &str, actual: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidRange,
            format!("{} {}, but was {}", field, requirement, actual),
        )
    }

    /// "Blueprint with ID {id} not found".
    pub fn blueprint_not_found(id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityNotFound,
            format!("Blueprint with ID {} not found", id),
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EntityNotFound, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = if self.code.is_client_visible() {
            self
        } else {
            tracing::error!(code = %self.code, error = %self.message, "HTTP request failed");
            ApiError::new(self.code, INTERNAL_ERROR_MESSAGE)
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// GRPC INTEGRATION
// ============================================================================

/// Client-visible codes pass through with their message. Everything else is
/// logged here and collapsed to a generic internal status.
impl From<ApiError> for Status {
    fn from(err: ApiError) -> Self {
        if !err.code.is_client_visible() {
            tracing::error!(code = %err.code, error = %err.message, "Request failed");
            return Status::internal(INTERNAL_ERROR_MESSAGE);
        }
        Status::new(err.code.grpc_code(), err.message)
    }
}

// ============================================================================
// CONVERSIONS FROM CORE ERRORS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyName => ApiError::validation_failed(err.to_string()),
            ValidationError::InvalidId { .. } => ApiError::invalid_format(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let code = match &err {
            StoreError::Pool { .. } => ErrorCode::ConnectionPoolExhausted,
            StoreError::Connection { .. } => ErrorCode::ServiceUnavailable,
            StoreError::Query { .. } => ErrorCode::DatabaseError,
            StoreError::Timeout { .. } => ErrorCode::Timeout,
            StoreError::Cancelled { .. } => ErrorCode::Cancelled,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<BlueprintError> for ApiError {
    fn from(err: BlueprintError) -> Self {
        match err {
            BlueprintError::Validation(e) => e.into(),
            BlueprintError::Store(e) => e.into(),
        }
    }
}

/// Violated rules are also kept as structured details.
impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        let details = match &err {
            ConfigError::InvalidService { errors } | ConfigError::InvalidDatabase { errors } => {
                serde_json::json!({ "errors": errors })
            }
            ConfigError::InvalidValue { field, value, .. } => {
                serde_json::json!({ "field": field, "value": value })
            }
        };
        ApiError::new(ErrorCode::ConfigurationInvalid, err.to_string()).with_details(details)
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
