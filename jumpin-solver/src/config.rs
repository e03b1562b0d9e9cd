//! Solver configuration.
//!
//! ```
//! use jumpin_solver::SolverConfig;
//!
//! let config = SolverConfig::from_toml_str("max_states = 5000").unwrap();
//! assert_eq!(config.max_states, 5000);
//! assert_eq!(config.log_interval_secs, 5);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Stop searching once this many distinct states have been discovered.
    pub max_states: usize,

    /// Seconds between progress log lines.
    pub log_interval_secs: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_states: 1_000_000,
            log_interval_secs: 5,
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = max_states;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_states == 0 {
            return Err(ConfigError::Invalid("max_states must be positive".into()));
        }
        Ok(())
    }
}
