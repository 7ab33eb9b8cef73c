//! Configuration validation for the resolution server.

use std::{net::SocketAddr, path::Path};

use realmpath_types::Budget;
use thiserror::Error;
use tracing::debug;

use crate::config::ServerConfig;

/// Validate the entire server configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), ValidationError> {
    config
        .bind_address
        .parse::<SocketAddr>()
        .map_err(|error| ValidationError::InvalidBindAddress {
            address: config.bind_address.clone(),
            reason: error.to_string(),
        })?;

    let budget = &config.budget;
    validate_limit("budget.maxHops", budget.max_hops as u64, Budget::LIMIT_MAX_HOPS as u64)?;
    validate_limit("budget.maxConcurrent", budget.max_concurrent as u64, Budget::LIMIT_MAX_CONCURRENT as u64)?;
    validate_limit("budget.maxWallClockMs", budget.max_wall_clock_ms, Budget::LIMIT_MAX_WALL_CLOCK_MS)?;

    if let Some(path) = &config.graph_path {
        validate_fixture_path("graphPath", path)?;
    }
    if let Some(path) = &config.rules_path {
        validate_fixture_path("rulesPath", path)?;
    }

    debug!(bind_address = %config.bind_address, budget = ?config.budget, "validated server configuration");
    Ok(())
}

fn validate_limit(field: &'static str, value: u64, max: u64) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::InvalidLimit { field });
    }
    if value > max {
        return Err(ValidationError::LimitTooLarge { field, max });
    }
    Ok(())
}

fn validate_fixture_path(field: &'static str, path: &Path) -> Result<(), ValidationError> {
    if !path.is_file() {
        return Err(ValidationError::MissingFile {
            field,
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid bind address '{address}': {reason}")]
    InvalidBindAddress { address: String, reason: String },

    #[error("'{field}' must be at least 1")]
    InvalidLimit { field: &'static str },

    #[error("'{field}' must be at most {max}")]
    LimitTooLarge { field: &'static str, max: u64 },

    #[error("'{field}' points to '{path}', which is not a readable file")]
    MissingFile { field: &'static str, path: String },
}
