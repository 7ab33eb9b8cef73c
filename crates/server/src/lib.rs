//! HTTP surface and configuration for the Realmpath resolution engine.
//!
//! - `config`: JSON configuration file loading and validation
//! - `http`: axum router, handlers, and a start/stop server handle

pub mod config;
pub mod http;

pub use config::{ConfigError, ServerConfig, default_config_path, load_config, load_config_from_path};
pub use http::{AppState, ResolutionHttpServer, RunningHttpServer, resolve_bind_address, router};
