//! Configuration types
//!
//! Both configurations load from environment variables with development
//! defaults, and must pass `validate()` before any component is built from them.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;

/// Service-level settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Name reported to tracing and health checks
    pub service_name: String,
    /// Deployment environment (production, staging, development)
    pub environment: String,
    /// Per-request deadline applied by the gRPC server
    pub request_timeout: Duration,
    /// Concurrent in-flight requests allowed per connection
    pub max_concurrent_requests: usize,
    /// gRPC listen address
    pub grpc_addr: SocketAddr,
    /// Health endpoint listen address
    pub health_addr: SocketAddr,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "BlueprintService".to_string(),
            environment: "development".to_string(),
            request_timeout: Duration::from_secs(30),
            max_concurrent_requests: 100,
            grpc_addr: SocketAddr::from(([0, 0, 0, 0], 50051)),
            health_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl ServiceConfig {
    /// Load from environment variables.
    ///
    /// Environment variables:
    /// - `BLUEPRINT_SERVICE_NAME` (default: "BlueprintService")
    /// - `BLUEPRINT_ENVIRONMENT` (default: "development")
    /// - `BLUEPRINT_REQUEST_TIMEOUT_SECS` (default: 30)
    /// - `BLUEPRINT_MAX_CONCURRENT_REQUESTS` (default: 100)
    /// - `BLUEPRINT_GRPC_ADDR` (default: 0.0.0.0:50051)
    /// - `BLUEPRINT_HEALTH_ADDR` (default: 0.0.0.0:8080)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            service_name: std::env::var("BLUEPRINT_SERVICE_NAME")
                .unwrap_or(defaults.service_name),
            environment: std::env::var("BLUEPRINT_ENVIRONMENT").unwrap_or(defaults.environment),
            request_timeout: env_parse("BLUEPRINT_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_concurrent_requests: env_parse("BLUEPRINT_MAX_CONCURRENT_REQUESTS")?
                .unwrap_or(defaults.max_concurrent_requests),
            grpc_addr: env_parse("BLUEPRINT_GRPC_ADDR")?.unwrap_or(defaults.grpc_addr),
            health_addr: env_parse("BLUEPRINT_HEALTH_ADDR")?.unwrap_or(defaults.health_addr),
        })
    }

    /// Check every rule and report all violations at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.service_name.is_empty() {
            errors.push("ServiceName cannot be empty".to_string());
        }
        if self.request_timeout.is_zero() {
            errors.push(format!(
                "RequestTimeout must be positive, but was {:?}",
                self.request_timeout
            ));
        }
        if self.max_concurrent_requests == 0 {
            errors.push(format!(
                "MaxConcurrentRequests must be positive, but was {}",
                self.max_concurrent_requests
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::InvalidService { errors })
        }
    }
}

/// Relational store settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// PostgreSQL URL or key/value connection string
    pub connection_string: String,
    /// Upper bound for a single statement
    pub command_timeout: Duration,
    /// Maximum pooled connections
    pub max_pool_size: usize,
    /// Idle connections older than this are evicted from the pool
    pub connection_idle_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            command_timeout: Duration::from_secs(30),
            max_pool_size: 100,
            connection_idle_timeout: Duration::from_secs(5 * 60),
        }
    }
}

impl DatabaseConfig {
    /// Create a configuration for the given connection string with defaults.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            ..Self::default()
        }
    }

    /// Load from environment variables.
    ///
    /// Environment variables:
    /// - `BLUEPRINT_DB_URL` (required by `validate`)
    /// - `BLUEPRINT_DB_COMMAND_TIMEOUT_SECS` (default: 30)
    /// - `BLUEPRINT_DB_MAX_POOL_SIZE` (default: 100)
    /// - `BLUEPRINT_DB_IDLE_TIMEOUT_SECS` (default: 300)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            connection_string: std::env::var("BLUEPRINT_DB_URL").unwrap_or_default(),
            command_timeout: env_parse("BLUEPRINT_DB_COMMAND_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.command_timeout),
            max_pool_size: env_parse("BLUEPRINT_DB_MAX_POOL_SIZE")?
                .unwrap_or(defaults.max_pool_size),
            connection_idle_timeout: env_parse("BLUEPRINT_DB_IDLE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.connection_idle_timeout),
        })
    }

    /// Set the statement timeout.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the pool size.
    #[must_use]
    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Check every rule and report all violations at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.connection_string.is_empty() {
            errors.push("ConnectionString cannot be empty".to_string());
        }
        if self.command_timeout.is_zero() {
            errors.push(format!(
                "CommandTimeout must be positive, but was {:?}",
                self.command_timeout
            ));
        }
        if self.max_pool_size == 0 {
            errors.push(format!(
                "MaxPoolSize must be positive, but was {}",
                self.max_pool_size
            ));
        }
        if self.connection_idle_timeout.is_zero() {
            errors.push(format!(
                "ConnectionIdleTimeout must be positive, but was {:?}",
                self.connection_idle_timeout
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::InvalidDatabase { errors })
        }
    }
}

/// Parse an optional environment variable; a present but unparsable value is an error.
fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: key.to_string(),
                value,
                reason: "could not be parsed".to_string(),
            }),
        Err(_) => Ok(None),
    }
}
