//! Configuration file loading for labrun
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, File, FileFormat};

use crate::config::{Config, ConfigError};

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.python_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("python_path is empty".to_string()));
        }
        if !self.timeout.is_finite() || self.timeout <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "timeout must be a positive number of seconds, got {}",
                self.timeout
            )));
        }
        if self.stdout_cap == 0 {
            return Err(ConfigError::Invalid(
                "stdout_cap must be greater than zero".to_string(),
            ));
        }
        if self.diagnostic_limit == 0 {
            return Err(ConfigError::Invalid(
                "diagnostic_limit must be greater than zero".to_string(),
            ));
        }

        self.policy.validate()
    }
}
