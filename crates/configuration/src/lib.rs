//! # Configuration
//!
//! Loads the catalog service settings from an optional `config.toml` and
//! `CATALOG__*` environment variables.
//!
//! ## Architectural Principles
//!
//! - **Layered Sources:** The TOML file is read first; environment variables override
//!   individual keys (`CATALOG__SERVER__PORT=8080` sets `server.port`).
//! - **Defaults Everywhere:** Every key has a default, so a missing file is not an error.
//! - **Validated on Load:** A `Config` returned from this crate has already passed
//!   `Config::validate`.
//!
//! ## Public API
//!
//! - `load_config`: reads `config.toml` from the working directory.
//! - `load_config_from`: reads an explicit file path.
//! - `Config` and its section structs.

use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{Config, DatabaseSettings, LogFormat, LoggingSettings, ServerSettings};

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "CATALOG";
const ENV_SEPARATOR: &str = "__";

/// Loads the application configuration from `config.toml` in the working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new(DEFAULT_CONFIG_FILE))
}

/// Loads the application configuration from `path`, then applies environment overrides.
///
/// The file is optional; a missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    build(path, environment())
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}

fn build(path: &Path, environment: config::Environment) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(environment)
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
