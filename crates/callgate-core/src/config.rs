//! Dispatch configuration loaded from YAML.
//!
//! ```yaml
//! builtins:
//!   discovery: true   # discovery.get_services / get_methods / get_tasks
//!   server: false     # server.status / reload_plugins / ...
//! ```
//!
//! Every key is optional; an empty document enables all built-in services.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Which built-in services to register.
    #[serde(default)]
    pub builtins: BuiltinServices,
}

/// Toggles for the built-in services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinServices {
    #[serde(default = "default_true")]
    pub discovery: bool,

    #[serde(default = "default_true")]
    pub server: bool,
}

impl Default for BuiltinServices {
    fn default() -> Self {
        Self {
            discovery: true,
            server: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl DispatchConfig {
    /// Parse a YAML document. An empty document yields the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }
}
