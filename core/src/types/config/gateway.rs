use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Host-level gateway settings, persisted as fzgate.toml.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub engine: EngineSettings,
}

impl GatewaySettings {
    /// Loads settings from a TOML file. Returns defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Returns the list of invalid values. Empty if the settings are usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.logging.filter.trim().is_empty() {
            errors.push("logging.filter must not be empty".to_string());
        }

        if self.engine.result_limit == Some(0) {
            errors.push("engine.result_limit must be at least 1 when set".to_string());
        }

        errors
    }
}

/// Subscriber settings used by the hosts. Libraries never install a subscriber.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, e.g. `info` or `fzgate_core=debug`.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Maximum matches per result. Unlimited when unset.
    #[serde(default)]
    pub result_limit: Option<usize>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
