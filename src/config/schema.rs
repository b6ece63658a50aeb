//! Configuration schema for Mirror
//!
//! User configuration is stored at `~/.config/mirror/config.toml`; a
//! project may carry its own `.mirror.toml`.

use crate::cache::DEFAULT_CACHE_DIR;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Pipeline settings
    pub loader: LoaderSettings,

    /// Compiler settings
    pub toolchain: ToolchainConfig,

    /// Watch mode settings
    pub watch: WatchConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Package to load models from
    pub target: PathBuf,

    /// Keep cache entries after each run for inspection
    pub preserve_cache: bool,

    /// Synthesize `X<Type>` symbols for the requested types
    pub generate_symbols: bool,

    /// Cache root directory
    pub cache_dir: PathBuf,

    /// Default symbols when none are given on the command line
    pub models: Vec<String>,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            target: PathBuf::from("."),
            preserve_cache: false,
            generate_symbols: false,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            models: vec![],
        }
    }
}

/// Compiler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Compiler executable
    pub rustc: PathBuf,

    /// Edition the package is compiled with
    pub edition: String,

    /// Extra arguments appended before the crate root
    pub args: Vec<String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            rustc: PathBuf::from("rustc"),
            edition: "2021".to_string(),
            args: vec![],
        }
    }
}

/// Watch mode settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet interval before a burst of changes triggers a reload
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}
