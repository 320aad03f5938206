//! Service configuration.
//!
//! Reads from environment variables (after `dotenvy`):
//!   EA_CONFIRM_BIND_ADDR            listen address (default: 0.0.0.0:3000)
//!   EA_CONFIRM_TTL_SECS             confirmation lifetime (default: 1200)
//!   EA_CONFIRM_FLASH_TTL_SECS       flash entry lifetime (default: 60)
//!   EA_CONFIRM_SWEEP_INTERVAL_SECS  expiry sweep interval (default: 60)
//!   EA_CONFIRM_PATH                 confirmation page route (default: /Confirmation)
//!   EA_CONFIRM_ERROR_PATH           generic error page route (default: /Error)
//!
//! or from a YAML file with the same keys in snake_case.

use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::confirm::flash::DEFAULT_FLASH_TTL_SECS;
use crate::confirm::service::{DEFAULT_CONFIRMATION_PATH, DEFAULT_CONFIRMATION_TTL_SECS};

/// Longest accepted confirmation or flash lifetime (30 days)
pub const MAX_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Longest accepted sweep interval (1 day)
pub const MAX_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub bind_addr: String,
    pub default_ttl_secs: i64,
    pub flash_ttl_secs: i64,
    pub sweep_interval_secs: u64,
    pub confirmation_path: String,
    pub error_path: String,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            default_ttl_secs: DEFAULT_CONFIRMATION_TTL_SECS,
            flash_ttl_secs: DEFAULT_FLASH_TTL_SECS,
            sweep_interval_secs: 60,
            confirmation_path: DEFAULT_CONFIRMATION_PATH.to_string(),
            error_path: "/Error".to_string(),
        }
    }
}

impl ConfirmationConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("EA_CONFIRM_BIND_ADDR") {
            config.bind_addr = v;
        }
        if let Some(v) = lookup("EA_CONFIRM_TTL_SECS") {
            config.default_ttl_secs = parse_value("EA_CONFIRM_TTL_SECS", v)?;
        }
        if let Some(v) = lookup("EA_CONFIRM_FLASH_TTL_SECS") {
            config.flash_ttl_secs = parse_value("EA_CONFIRM_FLASH_TTL_SECS", v)?;
        }
        if let Some(v) = lookup("EA_CONFIRM_SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = parse_value("EA_CONFIRM_SWEEP_INTERVAL_SECS", v)?;
        }
        if let Some(v) = lookup("EA_CONFIRM_PATH") {
            config.confirmation_path = v;
        }
        if let Some(v) = lookup("EA_CONFIRM_ERROR_PATH") {
            config.error_path = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, secs) in [
            ("default_ttl_secs", self.default_ttl_secs),
            ("flash_ttl_secs", self.flash_ttl_secs),
        ] {
            if !(1..=MAX_TTL_SECS).contains(&secs) {
                return Err(ConfigError::Invalid(format!(
                    "{key} must be between 1 and {MAX_TTL_SECS}, got {secs}"
                )));
            }
        }
        if !(1..=MAX_SWEEP_INTERVAL_SECS).contains(&self.sweep_interval_secs) {
            return Err(ConfigError::Invalid(format!(
                "sweep_interval_secs must be between 1 and {MAX_SWEEP_INTERVAL_SECS}, got {}",
                self.sweep_interval_secs
            )));
        }
        for (key, path) in [
            ("confirmation_path", &self.confirmation_path),
            ("error_path", &self.error_path),
        ] {
            if !path.starts_with('/') || path.starts_with("//") || path.contains('?') {
                return Err(ConfigError::Invalid(format!(
                    "{key} must be a local path, got {path:?}"
                )));
            }
        }
        if self.confirmation_path == self.error_path {
            return Err(ConfigError::Invalid(
                "confirmation_path and error_path must differ".into(),
            ));
        }
        Ok(())
    }

    // Accessors clamp so a config built without `validate` cannot panic.
    pub fn default_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.default_ttl_secs.clamp(0, MAX_TTL_SECS))
    }

    pub fn flash_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.flash_ttl_secs.clamp(0, MAX_TTL_SECS))
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        let secs = self.sweep_interval_secs.clamp(1, MAX_SWEEP_INTERVAL_SECS);
        std::time::Duration::from_secs(secs)
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    let parsed = value.trim().parse().ok();
    parsed.ok_or(ConfigError::InvalidValue { key, value })
}
