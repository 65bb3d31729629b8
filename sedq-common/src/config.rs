//! Configuration file resolution and TOML loading
//!
//! Config file lookup follows a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config file (`<config dir>/sedq/<module>.toml`), if it exists
//! 4. No file: compiled defaults only
//!
//! A missing config file is never fatal: it produces a warning and the
//! compiled defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable consulted when no `--config` argument is given
pub const CONFIG_ENV_VAR: &str = "SEDQ_CONFIG";

/// Logging section shared by every service config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set ("trace" .. "error")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Where a resolved config path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    UserConfigDir,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CommandLine => write!(f, "command line"),
            ConfigSource::Environment => write!(f, "environment"),
            ConfigSource::UserConfigDir => write!(f, "user config directory"),
        }
    }
}

/// Resolves the config file path for one module
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    module_name: String,
    env_var: String,
}

impl ConfigResolver {
    /// Create a resolver for `module_name` (e.g. "engine" → `sedq/engine.toml`)
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            env_var: CONFIG_ENV_VAR.to_string(),
        }
    }

    /// Use a different environment variable than `SEDQ_CONFIG`
    pub fn with_env_var(mut self, env_var: impl Into<String>) -> Self {
        self.env_var = env_var.into();
        self
    }

    /// Resolve the config path, or `None` when only compiled defaults apply
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Option<(PathBuf, ConfigSource)> {
        if let Some(path) = cli_arg {
            return Some((path.to_path_buf(), ConfigSource::CommandLine));
        }

        if let Ok(path) = std::env::var(&self.env_var) {
            if !path.trim().is_empty() {
                return Some((PathBuf::from(path), ConfigSource::Environment));
            }
        }

        let user_path = self.user_config_path()?;
        if user_path.exists() {
            return Some((user_path, ConfigSource::UserConfigDir));
        }

        None
    }

    /// Per-user config file location for this module
    pub fn user_config_path(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("sedq").join(format!("{}.toml", self.module_name)))
    }
}

/// Load a TOML config file, falling back to `T::default()` when there is none
///
/// - `None` path: compiled defaults
/// - path that does not exist: warning + compiled defaults
/// - unreadable file: `Error::Io`
/// - malformed TOML: `Error::Config`
pub fn load_toml_or_default<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        debug!("No config file resolved, using compiled defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using compiled defaults",
            path.display()
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}
