//! The CLI configuration file: bridge settings plus diagnostic logging.
//!
//! ```toml
//! [bridge]
//! dispatch = "serial"
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sysbridge::BridgeConfig;
use sysbridge_telemetry::LogConfig;

/// Everything the CLI reads from `--config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct CliConfig {
    /// Channel and dispatch settings.
    pub(crate) bridge: BridgeConfig,
    /// Diagnostic output settings.
    pub(crate) logging: LogConfig,
}

impl CliConfig {
    pub(crate) fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("invalid configuration")?;
        config
            .bridge
            .validate()
            .context("invalid [bridge] section")?;
        Ok(config)
    }

    pub(crate) fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }
}
