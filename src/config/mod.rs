//! # Garage Task Configuration
//!
//! Every knob the engine reads, grouped by concern. All sections carry working
//! defaults, so an empty file (or no file at all) yields a usable setup.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use garage_tasks::config::GarageConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // defaults -> config/garage.toml -> GARAGE__SECTION__KEY variables
//! let config = GarageConfig::load()?;
//! let attempts = config.retry.max_attempts;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_CALL_TIMEOUT, DEFAULT_CAR_IDS, DEFAULT_DATABASE_URL, DEFAULT_GARAGE_LATENCY,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_UPDATE_STATUS_PROBABILITY, MEMORY_DATABASE_URL,
};
use crate::resilience::RetryPolicy;

pub use error::{ConfigResult, ConfigurationError};

/// Root configuration structure mirroring config/garage.toml
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GarageConfig {
    /// Task store connection settings
    pub database: DatabaseConfig,

    /// Simulated garage behaviour and call bounds
    pub garage: GarageSettings,

    /// Retry budget for the status update step
    pub retry: RetryConfig,

    /// Background run scheduling
    pub dispatcher: DispatcherConfig,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite url, or `memory` for the in-process store
    pub url: String,
    pub max_connections: u32,
    /// Run embedded migrations on connect
    pub auto_migrate: bool,
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self {
            url: MEMORY_DATABASE_URL.to_string(),
            ..Self::default()
        }
    }

    pub fn is_in_memory_sqlite(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
            auto_migrate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GarageSettings {
    /// Simulated round trip of each garage call
    pub latency_ms: u64,
    /// Percent chance (0..=100) that a status update succeeds
    pub update_status_probability: u8,
    /// Bound on a single garage call inside a step
    pub call_timeout_ms: u64,
    /// Cars seeded into the simulated garage
    pub car_ids: Vec<String>,
}

impl GarageSettings {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl Default for GarageSettings {
    fn default() -> Self {
        Self {
            latency_ms: u64::try_from(DEFAULT_GARAGE_LATENCY.as_millis()).unwrap_or(u64::MAX),
            update_status_probability: DEFAULT_UPDATE_STATUS_PROBABILITY,
            call_timeout_ms: u64::try_from(DEFAULT_CALL_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            car_ids: DEFAULT_CAR_IDS.iter().map(|id| id.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Runs allowed in flight at once; 0 disables the bound
    pub max_in_flight: usize,
    /// Refuse runs beyond the bound instead of queueing them
    pub reject_when_full: bool,
}

impl DispatcherConfig {
    pub fn in_flight_limit(&self) -> Option<usize> {
        (self.max_in_flight > 0).then_some(self.max_in_flight)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 64,
            reject_when_full: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by RUST_LOG
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl GarageConfig {
    /// Reject values that would make runs unbounded or meaningless
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "database.url",
                "",
                "database url must not be empty",
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                0,
                "at least one connection is required",
            ));
        }
        if self.garage.update_status_probability > 100 {
            return Err(ConfigurationError::invalid_value(
                "garage.update_status_probability",
                self.garage.update_status_probability,
                "probability is a percentage between 0 and 100",
            ));
        }
        if self.garage.call_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "garage.call_timeout_ms",
                0,
                "garage calls must be bounded by a positive timeout",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "retry.max_attempts",
                0,
                "at least one attempt is required",
            ));
        }
        Ok(())
    }

    /// Configuration for tests and local experiments: in-memory store, no latency
    pub fn for_testing() -> Self {
        Self {
            database: DatabaseConfig::in_memory(),
            garage: GarageSettings {
                latency_ms: 0,
                update_status_probability: 100,
                ..GarageSettings::default()
            },
            ..Self::default()
        }
    }
}
