//! Registry configuration.
//!
//! # Responsibility
//! - Describe host-level registry settings (default partition, preloads,
//!   logging).
//! - Read them from a module `.properties` resource.
//!
//! # Invariants
//! - A loaded configuration always has a non-blank default isolation key.
//! - `log_level` is always one of `trace|debug|info|warn|error`.

use crate::logging::{default_log_level, normalize_level};
use crate::partition::key::DEFAULT_ISOLATION_KEY;
use crate::properties::{format_property_values, load_properties, Properties};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const KEY_DEFAULT_ISOLATION_KEY: &str = "modscope.default-isolation-key";
pub const KEY_PRELOAD_PARTITIONS: &str = "modscope.preload-partitions";
pub const KEY_LOG_LEVEL: &str = "modscope.log.level";
pub const KEY_LOG_DIR: &str = "modscope.log.dir";

/// Host-level registry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Partition used when a caller supplies no isolation key.
    pub default_isolation_key: String,
    /// Partitions created eagerly at registry construction.
    pub preload_partitions: BTreeSet<String>,
    pub log_level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_isolation_key: DEFAULT_ISOLATION_KEY.to_string(),
            preload_partitions: BTreeSet::new(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl RegistryConfig {
    /// Builds configuration from parsed properties, defaulting absent keys.
    ///
    /// # Errors
    /// - `BlankDefaultIsolationKey` when the default key is set but blank.
    /// - `UnsupportedLogLevel` when the log level is unknown.
    pub fn from_properties(properties: &Properties) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = properties.get(KEY_DEFAULT_ISOLATION_KEY) {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::BlankDefaultIsolationKey);
            }
            config.default_isolation_key = trimmed.to_string();
        }

        if let Some(value) = properties.get(KEY_PRELOAD_PARTITIONS) {
            config.preload_partitions = format_property_values(value);
        }

        if let Some(value) = properties.get(KEY_LOG_LEVEL) {
            config.log_level = normalize_level(value)
                .map_err(|_| ConfigError::UnsupportedLogLevel(value.trim().to_string()))?
                .to_string();
        }

        if let Some(value) = properties.get(KEY_LOG_DIR) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                config.log_dir = Some(PathBuf::from(trimmed));
            }
        }

        Ok(config)
    }

    /// Loads `resource` under `root` and builds configuration from it.
    ///
    /// A missing resource yields the default configuration.
    pub fn load(root: impl AsRef<Path>, resource: &str) -> Result<Self, ConfigError> {
        Self::from_properties(&load_properties(root, resource))
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    BlankDefaultIsolationKey,
    UnsupportedLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankDefaultIsolationKey => {
                write!(f, "`{KEY_DEFAULT_ISOLATION_KEY}` must not be blank")
            }
            Self::UnsupportedLogLevel(value) => write!(
                f,
                "`{KEY_LOG_LEVEL}` is unsupported: {value}; expected trace|debug|info|warn|error"
            ),
        }
    }
}

impl Error for ConfigError {}
