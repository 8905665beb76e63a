//! Repair configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::storage::{JsonStorage, StorageBackend};

/// Default name of the directory (below the content path) holding backups
pub const DEFAULT_DATA_DIR: &str = "data";

/// Source of environment variables
///
/// Injected so tests can resolve paths without touching the process env.
pub trait EnvSource: Send + Sync {
    /// Look up a variable by name
    fn var(&self, key: &str) -> Result<String, std::env::VarError>;
}

/// Reads from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEnvSource;

impl EnvSource for DefaultEnvSource {
    fn var(&self, key: &str) -> Result<String, std::env::VarError> {
        std::env::var(key)
    }
}

/// Configuration for a [`SettingsRepair`](crate::SettingsRepair) run
#[derive(Debug, Clone)]
pub struct RepairConfig<S: StorageBackend = JsonStorage> {
    /// Root content directory of the host installation
    pub content_path: PathBuf,

    /// Name of the subdirectory holding dated backup files
    pub data_dir: String,

    /// Storage backend used to load backup documents
    pub storage: S,
}

impl Default for RepairConfig<JsonStorage> {
    fn default() -> Self {
        Self {
            content_path: PathBuf::from("content"),
            data_dir: DEFAULT_DATA_DIR.into(),
            storage: JsonStorage::new(),
        }
    }
}

impl<S: StorageBackend> RepairConfig<S> {
    /// Directory scanned for `ghost.<YYYY-MM-DD>.json` backups
    pub fn data_path(&self) -> PathBuf {
        self.content_path.join(&self.data_dir)
    }
}

impl RepairConfig<JsonStorage> {
    /// Create a new builder for RepairConfig
    ///
    /// # Example
    /// ```rust
    /// use settings_repair::RepairConfig;
    ///
    /// let config = RepairConfig::builder()
    ///     .content_path("/var/lib/blog/content")
    ///     .build();
    /// assert!(config.data_path().ends_with("content/data"));
    /// ```
    pub fn builder() -> RepairConfigBuilder {
        RepairConfigBuilder::new()
    }
}

/// Builder for creating RepairConfig with a fluent API
#[derive(Clone)]
pub struct RepairConfigBuilder {
    content_path: Option<PathBuf>,
    data_dir: String,
    pretty_json: bool,
    env_source: Arc<dyn EnvSource>,
}

impl std::fmt::Debug for RepairConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepairConfigBuilder")
            .field("content_path", &self.content_path)
            .field("data_dir", &self.data_dir)
            .field("pretty_json", &self.pretty_json)
            .finish_non_exhaustive()
    }
}

impl Default for RepairConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RepairConfigBuilder {
    pub fn new() -> Self {
        Self {
            content_path: None,
            data_dir: DEFAULT_DATA_DIR.into(),
            pretty_json: true,
            env_source: Arc::new(DefaultEnvSource),
        }
    }

    /// Set the content directory
    ///
    /// Supports `~` expansion for home directory.
    pub fn content_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.content_path = Some(expand_home(path.into()));
        self
    }

    /// Take the content directory from an environment variable, if set
    ///
    /// An unset or empty variable leaves the current value untouched.
    pub fn content_path_from_env(mut self, var: &str) -> Self {
        match self.env_source.var(var) {
            Ok(value) if !value.trim().is_empty() => {
                log::debug!("Content path taken from ${var}");
                self.content_path = Some(expand_home(PathBuf::from(value.trim())));
            }
            _ => log::debug!("${var} not set, keeping configured content path"),
        }
        self
    }

    /// Replace the environment lookup used by [`content_path_from_env`](Self::content_path_from_env)
    pub fn env_source(mut self, source: impl EnvSource + 'static) -> Self {
        self.env_source = Arc::new(source);
        self
    }

    /// Set the backup subdirectory name (default: "data")
    pub fn data_dir(mut self, name: impl Into<String>) -> Self {
        self.data_dir = name.into();
        self
    }

    /// Use compact JSON (no pretty printing)
    pub fn compact_json(mut self) -> Self {
        self.pretty_json = false;
        self
    }

    /// Build the RepairConfig
    ///
    /// If no content path was given, falls back to `./content`.
    pub fn build(self) -> RepairConfig<JsonStorage> {
        let storage = if self.pretty_json {
            JsonStorage::new()
        } else {
            JsonStorage::compact()
        };

        RepairConfig {
            content_path: self
                .content_path
                .unwrap_or_else(|| PathBuf::from("content")),
            data_dir: self.data_dir,
            storage,
        }
    }
}

fn expand_home(path: PathBuf) -> PathBuf {
    if !path.starts_with("~") {
        return path;
    }
    match dirs::home_dir() {
        Some(home) => home.join(path.strip_prefix("~").unwrap_or(Path::new(""))),
        None => path,
    }
}
