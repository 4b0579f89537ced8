use std::env;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ConfigError(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LpmConfig {
    /// Use http instead of https when pushing
    pub plain_http: bool,
    /// Upper bound for a whole push, in seconds
    pub push_timeout_secs: u64,
    /// Registry for target references without a hostname
    pub default_registry: String,
}

impl LpmConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(Environment::with_prefix("LPM"))
    }

    fn load_with(environment: Environment) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "dev".into());

        let config = Config::builder()
            // Start with default values
            .set_default("plain_http", false)?
            .set_default("push_timeout_secs", 300)?
            .set_default("default_registry", "docker.io")?
            // Add configuration from files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // LPM_PUSH_TIMEOUT_SECS and friends
            .add_source(
                environment
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }
}

impl Default for LpmConfig {
    fn default() -> Self {
        Self {
            plain_http: false,
            push_timeout_secs: 300,
            default_registry: "docker.io".to_string(),
        }
    }
}
