//! Configuration IO helpers for the resolution server.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use dirs_next::{config_dir, home_dir};
use tracing::debug;

use crate::config::{ConfigError, ServerConfig, validate_config};

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "REALMPATH_CONFIG_PATH";

/// Returns the default path for the server configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("realmpath").join("config.json")
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    if trimmed == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = trimmed.strip_prefix("~/") {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(trimmed)
}

/// Loads and parses server configuration from the default path.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
    let path = default_config_path();
    load_config_from_path(&path)
}

/// Loads and parses server configuration from a specific path.
///
/// A missing file yields the defaults. Fixture paths are tilde-expanded and
/// resolved relative to the configuration file's directory before validation.
pub fn load_config_from_path(path: &Path) -> Result<ServerConfig, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "no configuration file; using defaults");
        let config = ServerConfig::default();
        validate_config(&config)?;
        return Ok(config);
    }

    let content = fs::read_to_string(path)?;
    let mut config: ServerConfig = serde_json::from_str(&content)?;
    let base_directory = path.parent().unwrap_or_else(|| Path::new("."));
    config.graph_path = config.graph_path.map(|fixture| resolve_fixture_path(base_directory, &fixture));
    config.rules_path = config.rules_path.map(|fixture| resolve_fixture_path(base_directory, &fixture));
    validate_config(&config)?;
    Ok(config)
}

fn resolve_fixture_path(base_directory: &Path, fixture: &Path) -> PathBuf {
    let expanded = expand_tilde(&fixture.to_string_lossy());
    if expanded.is_absolute() {
        expanded
    } else {
        base_directory.join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_BIND_ADDRESS, ValidationError};
    use std::io::Write;

    #[test]
    fn default_path_honors_environment_override() {
        let override_path = "~/custom/realmpath/config.json";
        temp_env::with_var(CONFIG_PATH_ENV, Some(override_path), || {
            let path = default_config_path();
            let expected = expand_tilde(override_path);
            assert_eq!(path, expected);
        });
    }

    #[test]
    fn default_path_ignores_blank_override() {
        temp_env::with_var(CONFIG_PATH_ENV, Some("  "), || {
            let path = default_config_path();
            assert!(path.ends_with("realmpath/config.json"), "unexpected path {}", path.display());
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        let directory = tempfile::tempdir().expect("create temp dir");
        let config = load_config_from_path(&directory.path().join("absent.json")).expect("defaults");
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
    }

    #[test]
    fn relative_fixture_paths_resolve_next_to_the_config() {
        let directory = tempfile::tempdir().expect("create temp dir");
        fs::write(directory.path().join("graph.json"), r#"{ "entities": [] }"#).expect("write graph");
        let config_path = directory.path().join("config.json");
        let mut file = fs::File::create(&config_path).expect("create config");
        write!(file, r#"{{ "graphPath": "graph.json", "budget": {{ "maxWallClockMs": 500 }} }}"#).expect("write config");

        let config = load_config_from_path(&config_path).expect("load config");

        assert_eq!(config.graph_path, Some(directory.path().join("graph.json")));
        assert_eq!(config.budget.max_wall_clock_ms, 500);
    }

    #[test]
    fn invalid_limits_fail_to_load() {
        let directory = tempfile::tempdir().expect("create temp dir");
        let config_path = directory.path().join("config.json");
        fs::write(&config_path, r#"{ "budget": { "maxHops": 0 } }"#).expect("write config");

        let error = load_config_from_path(&config_path).expect_err("zero hops rejected");
        assert!(matches!(error, ConfigError::Validation(ValidationError::InvalidLimit { .. })));
    }
}
