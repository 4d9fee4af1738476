//! Engine configuration
//!
//! Selects the monitor used by a pipeline. Stored as TOML:
//!
//! ```toml
//! monitor = "locking"
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.

use crate::pipeline::dispatcher::{channel, ChannelDispatcher, WorkQueue};
use crate::sync::{NoopMonitor, ReadWriteMonitor, SharedMonitor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or saving an [`EngineConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Which monitor guards a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MonitorKind {
    /// Read/write lock, re-entrant for the writing thread
    #[default]
    Locking,
    /// No locking; for pipelines confined to one thread
    Noop,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub monitor: MonitorKind,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load a config file, returning defaults if any error occurs
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default engine config: {}", e);
                Self::default()
            }
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save the config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, self.to_toml_string()?).map_err(io_err)
    }

    /// A fresh monitor of the configured kind.
    pub fn monitor(&self) -> SharedMonitor {
        match self.monitor {
            MonitorKind::Locking => ReadWriteMonitor::shared(),
            MonitorKind::Noop => NoopMonitor::shared(),
        }
    }

    /// A dispatcher/queue pair for replaying chains onto a worker thread.
    pub fn dispatcher(&self) -> (ChannelDispatcher, WorkQueue) {
        channel()
    }
}
