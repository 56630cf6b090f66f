//! Configuration Loader
//!
//! Layers sources with increasing precedence:
//! 1. Built-in defaults
//! 2. A TOML file (`config/garage.toml`, or the path in `GARAGE_CONFIG_PATH`)
//! 3. Environment variables `GARAGE__<SECTION>__<KEY>`

use config::{Config, Environment, File};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::ConfigResult;
use super::GarageConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/garage.toml";
pub const CONFIG_PATH_ENV: &str = "GARAGE_CONFIG_PATH";
pub const ENV_PREFIX: &str = "GARAGE";

impl GarageConfig {
    /// Load configuration from the default locations
    pub fn load() -> ConfigResult<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    /// Load configuration from a specific file; a missing file is not an error
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        Self::load_with_env(path, default_environment())
    }

    /// Load with an explicit environment source
    ///
    /// Tests pass a prepared `Environment` so they never touch process variables.
    pub fn load_with_env(path: &Path, environment: Environment) -> ConfigResult<Self> {
        debug!(path = %path.display(), "Loading configuration");

        let config: GarageConfig = Config::builder()
            .add_source(Config::try_from(&GarageConfig::default())?)
            .add_source(File::from(path).required(false))
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }
}

fn default_environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("garage.car_ids")
}
