//! Bridge configuration.
//!
//! Loaded from TOML; every field has a default, so an empty document is a
//! valid configuration.
//!
//! ```toml
//! dispatch = "serial"
//! name_policy = "reject"
//! max_name_len = 64
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Largest daemon name the channel accepts, in bytes.
pub const MAX_NAME_LEN: usize = 1023;

/// Maximum allowed config file size (64 KiB).
const MAX_CONFIG_FILE_SIZE: u64 = 65_536;

/// How log writes are moved off the host thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Writes run on the host's blocking worker pool. Completion order is
    /// unspecified.
    #[default]
    Pool,
    /// Writes run on one dedicated thread in submission order.
    Serial,
}

/// What `init` does with a daemon name longer than the limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePolicy {
    /// Cut the name at the last character boundary that fits.
    #[default]
    Truncate,
    /// Fail with an argument error.
    Reject,
}

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Dispatch strategy for `log`.
    pub dispatch: DispatchMode,
    /// Handling of over-long daemon names.
    pub name_policy: NamePolicy,
    /// Daemon name limit in bytes, at most [`MAX_NAME_LEN`].
    pub max_name_len: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::default(),
            name_policy: NamePolicy::default(),
            max_name_len: MAX_NAME_LEN,
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the document does not parse or a value is
    /// out of range.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: "<inline>".to_owned(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, is too large,
    /// does not parse, or holds an out-of-range value.
    pub fn load_file(path: &Path) -> ConfigResult<Self> {
        let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::ValidationError {
                field: path.display().to_string(),
                message: format!(
                    "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                    metadata.len()
                ),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;
        config.validate()?;
        debug!(path = %path.display(), ?config, "loaded bridge config");
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_name_len == 0 || self.max_name_len > MAX_NAME_LEN {
            return Err(ConfigError::ValidationError {
                field: "max_name_len".to_owned(),
                message: format!("must be between 1 and {MAX_NAME_LEN}"),
            });
        }
        Ok(())
    }
}
