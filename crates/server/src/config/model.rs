//! Data models for server configuration.

use std::path::PathBuf;

use realmpath_types::Budget;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8086";

/// Server configuration.
///
/// ```json
/// {
///   "bindAddress": "127.0.0.1:8086",
///   "budget": { "maxHops": 6, "maxConcurrent": 8, "maxWallClockMs": 2000 },
///   "graphPath": "~/realm/graph.json",
///   "rulesPath": "~/realm/rules.json"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Budget ceiling; requests may only tighten it.
    #[serde(default)]
    pub budget: Budget,

    /// Entity graph document backing the in-memory accessor.
    #[serde(default)]
    pub graph_path: Option<PathBuf>,

    /// JSON array of validation rules.
    #[serde(default)]
    pub rules_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            budget: Budget::default(),
            graph_path: None,
            rules_path: None,
        }
    }
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] crate::config::ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_fill_defaults() {
        let config: ServerConfig = serde_json::from_str(r#"{ "budget": { "maxHops": 3 } }"#).expect("parse config");
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.budget.max_hops, 3);
        assert_eq!(config.budget.max_concurrent, Budget::DEFAULT_MAX_CONCURRENT);
        assert!(config.graph_path.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_str::<ServerConfig>(r#"{ "bindAdress": "0.0.0.0:1" }"#);
        assert!(result.is_err());
    }
}
