//! Config loading, validation, and serialization.

use super::model::Config;
use crate::error::{LockError, Result};
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(LockError::UserError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LockError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| LockError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            LockError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values.
    ///
    /// - `default_timeout_secs` must be positive
    /// - `default_owner` must be non-empty
    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_secs == 0 {
            return Err(LockError::UserError(
                "config validation failed: default_timeout_secs must be greater than 0"
                    .to_string(),
            ));
        }

        if self.default_owner.is_empty() {
            return Err(LockError::UserError(
                "config validation failed: default_owner must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
