//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (pool sizes, limits, addresses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;

/// One semantic problem with the configuration.
#[derive(Debug)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the full configuration, collecting every error.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address",
            message: format!("not a valid socket address: {}", config.listener.bind_address),
        });
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError {
            field: "listener.request_timeout_secs",
            message: "must be greater than zero".to_string(),
        });
    }

    if !config.database.url.starts_with("postgres://")
        && !config.database.url.starts_with("postgresql://")
    {
        errors.push(ValidationError {
            field: "database.url",
            message: "must be a postgres:// URL".to_string(),
        });
    }
    if config.database.pool_max == 0 {
        errors.push(ValidationError {
            field: "database.pool_max",
            message: "must be at least 1".to_string(),
        });
    }
    if config.database.fallback_pool_max == 0 {
        errors.push(ValidationError {
            field: "database.fallback_pool_max",
            message: "must be at least 1, the cancel path depends on it".to_string(),
        });
    }

    if config.search.result_limit <= 0 {
        errors.push(ValidationError {
            field: "search.result_limit",
            message: "must be greater than zero".to_string(),
        });
    }
    if config.search.seed_chunk_size == 0 {
        errors.push(ValidationError {
            field: "search.seed_chunk_size",
            message: "must be greater than zero".to_string(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError {
            field: "observability.metrics_address",
            message: format!(
                "not a valid socket address: {}",
                config.observability.metrics_address
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
