//! Configuration management for the resolution server.
//! This module handles parsing and validation of the
//! ~/.config/realmpath/config.json configuration file.

mod io;
mod model;
mod validation;

pub use io::{CONFIG_PATH_ENV, default_config_path, expand_tilde, load_config, load_config_from_path};
pub use model::{ConfigError, DEFAULT_BIND_ADDRESS, ServerConfig};
pub use validation::{ValidationError, validate_config};
