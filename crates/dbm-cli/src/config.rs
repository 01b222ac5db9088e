//! Configuration types and parsing for dbmigrate.yml

use dbm_migrate::store::SCHEMA_NAME_MAX_LEN;
use dbm_migrate::GuardStrategy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    NotFound { path: String },

    /// C002: Configuration file could not be read
    #[error("[C002] Failed to read config {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// C003: Failed to parse configuration file
    #[error("[C003] Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// C004: Invalid configuration value
    #[error("[C004] Invalid config: {message}")]
    Invalid { message: String },
}

/// Result type alias for ConfigError
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Project configuration from dbmigrate.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database file path, or `:memory:`
    pub database: String,

    /// Schema (tenant) name whose version is tracked
    pub schema: String,

    /// Directory containing numbered SQL scripts, relative to the project
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,

    /// Concurrency guard strategy
    #[serde(default)]
    pub strategy: GuardStrategy,

    /// Apply migrations that share a version instead of failing
    #[serde(default)]
    pub allow_duplicate_versions: bool,
}

fn default_scripts_dir() -> String {
    "migrations".to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for dbmigrate.yml or dbmigrate.yaml
    pub fn load_from_dir(dir: &Path) -> ConfigResult<Self> {
        let yml_path = dir.join("dbmigrate.yml");
        let yaml_path = dir.join("dbmigrate.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(ConfigError::NotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "database path cannot be empty".to_string(),
            });
        }
        if self.schema.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "schema cannot be empty".to_string(),
            });
        }
        if self.schema.chars().count() > SCHEMA_NAME_MAX_LEN {
            return Err(ConfigError::Invalid {
                message: format!("schema cannot be longer than {SCHEMA_NAME_MAX_LEN} characters"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
