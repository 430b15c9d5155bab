//! TOML configuration for textmarker embedders.
//!
//! Exposes the engine's tuning knobs (context window width, fuzzy and
//! re-validation thresholds) and storage selection. The matching thresholds
//! are empirical defaults, not derived constants; recalibrate them here
//! rather than in code.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use textmarker_engine::context::DEFAULT_CONTEXT_CHARS;
use textmarker_engine::restore::RestoreOptions;
use textmarker_engine::store::HighlightStore;
use textmarker_engine::HighlighterOptions;
use textmarker_storage::{FileStore, MemoryStore};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("A channel store cannot be built from configuration; wire it to a live endpoint")]
    ChannelNotConstructible,
}

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Non-durable in-memory store.
    Memory,
    /// JSON file store, namespaced by key.
    File { path: PathBuf, namespace: String },
    /// Channel message-passing store; the endpoint comes from the embedding
    /// application, only the round-trip timeout is configured here.
    Channel {
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Width of each captured context window, in chars.
    pub context_chars: usize,
    /// Minimum similarity for the fuzzy restoration fallback.
    pub fuzzy_threshold: f64,
    /// Stricter post-hoc re-validation bar.
    pub revalidate_threshold: f64,
    /// CSS class applied to markers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_class: Option<String>,
    /// Color for new highlights with no explicit color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_color: Option<String>,
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        let restore = RestoreOptions::default();
        Self {
            context_chars: DEFAULT_CONTEXT_CHARS,
            fuzzy_threshold: restore.fuzzy_threshold,
            revalidate_threshold: restore.revalidate_threshold,
            mark_class: None,
            default_color: None,
            storage: StorageConfig::default(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in a configured store path.
        if let StorageConfig::File { path, .. } = &mut config.storage {
            if let Some(expanded) = expand_path(path) {
                *path = expanded;
            }
        }

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/textmarker");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Engine options corresponding to this configuration.
    pub fn highlighter_options(&self) -> HighlighterOptions {
        HighlighterOptions {
            context_chars: self.context_chars,
            restore: RestoreOptions {
                fuzzy_threshold: self.fuzzy_threshold,
                revalidate_threshold: self.revalidate_threshold,
            },
            mark_class: self.mark_class.clone(),
            default_color: self.default_color.clone(),
        }
    }

    /// Channel round-trip timeout, when a channel store is configured.
    pub fn storage_timeout(&self) -> Option<Duration> {
        match &self.storage {
            StorageConfig::Channel { timeout_secs } => Some(Duration::from_secs(*timeout_secs)),
            _ => None,
        }
    }

    /// Build the configured storage backend.
    ///
    /// A channel store needs a live endpoint from the embedder and cannot be
    /// constructed here; pair [`Self::storage_timeout`] with
    /// `textmarker_storage::ChannelStore::new` instead.
    pub fn build_store(&self) -> Result<Box<dyn HighlightStore>, ConfigError> {
        match &self.storage {
            StorageConfig::Memory => Ok(Box::new(MemoryStore::new())),
            StorageConfig::File { path, namespace } => {
                Ok(Box::new(FileStore::new(path.clone(), namespace.clone())))
            }
            StorageConfig::Channel { .. } => Err(ConfigError::ChannelNotConstructible),
        }
    }
}

fn expand_path(path: &Path) -> Option<PathBuf> {
    let path_str = path.to_string_lossy();
    match shellexpand::full(&path_str) {
        Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
        Err(_) => None,
    }
}
