//! Configuration loading
//!
//! Lookup order: `--config <path>`, a `.mirror.toml` in the working
//! directory or any ancestor, the user file under the platform config dir,
//! then built-in defaults. The first file found is used as a whole.

pub mod schema;

pub use schema::Config;

use crate::error::{MirrorError, MirrorResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Name of the project-local config file
pub const LOCAL_CONFIG_FILE: &str = ".mirror.toml";

/// Reads and writes the user configuration file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for the user config file
    pub fn new() -> Self {
        Self::with_path(Self::default_config_path())
    }

    /// Manager for an explicit config file
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// `<config dir>/mirror/config.toml`
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("mirror").join("config.toml")
    }

    /// Nearest `.mirror.toml` in `start` or its ancestors
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load the managed file; defaults when it does not exist
    pub async fn load(&self) -> MirrorResult<Config> {
        match Self::read(&self.config_path).await? {
            Some(config) => Ok(config),
            None => {
                debug!("No config at {}, using defaults", self.config_path.display());
                Ok(Config::default())
            }
        }
    }

    /// Load `local` when given, the managed file otherwise
    pub async fn load_with_local(&self, local: Option<&Path>) -> MirrorResult<Config> {
        let Some(path) = local else {
            return self.load().await;
        };

        Self::read(path).await?.ok_or_else(|| MirrorError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: "file disappeared while loading".to_string(),
        })
    }

    /// Parse a config file, `None` if it is missing
    async fn read(path: &Path) -> MirrorResult<Option<Config>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(MirrorError::io(
                    format!("reading config from {}", path.display()),
                    e,
                ))
            }
        };

        let config = toml::from_str(&content).map_err(|e| MirrorError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(Some(config))
    }

    /// Write `config` to the managed file, creating its directory
    pub async fn save(&self, config: &Config) -> MirrorResult<()> {
        if let Some(dir) = self.config_path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| MirrorError::ConfigDirCreate {
                    path: dir.to_path_buf(),
                    source: e,
                })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            MirrorError::io(format!("writing {}", self.config_path.display()), e)
        })?;

        info!("Wrote config to {}", self.config_path.display());
        Ok(())
    }

    /// The managed file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
