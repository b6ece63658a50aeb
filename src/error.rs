//! Error types for Mirror
//!
//! All modules use `MirrorResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Mirror operations
pub type MirrorResult<T> = Result<T, MirrorError>;

/// All errors that can occur in Mirror
#[derive(Error, Debug)]
pub enum MirrorError {
    // Pipeline errors
    #[error("Package not found at {path}: {reason}")]
    PackageNotFound { path: PathBuf, reason: String },

    #[error("Failed to copy package into cache {path}: {source}")]
    CacheCopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to synthesize symbols in {path}: {reason}")]
    SymbolSynthesisFailed { path: PathBuf, reason: String },

    #[error("Build failed for {path}:\n{diagnostics}")]
    BuildFailed { path: PathBuf, diagnostics: String },

    #[error("Failed to resolve symbol {name} in {artifact}: {reason}")]
    SymbolResolveFailed {
        artifact: PathBuf,
        name: String,
        reason: String,
    },

    // Watch errors
    #[error("File watch failed for {path}: {reason}")]
    WatchFailed { path: PathBuf, reason: String },

    // Toolchain errors
    #[error("Unsupported toolchain: {found} (requires {required} or newer)")]
    ToolchainUnsupported { found: String, required: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl MirrorError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a build failure carrying compiler diagnostics
    pub fn build_failed(path: impl Into<PathBuf>, diagnostics: impl Into<String>) -> Self {
        Self::BuildFailed {
            path: path.into(),
            diagnostics: diagnostics.into(),
        }
    }

    /// Whether the error belongs to a single pipeline run.
    ///
    /// In watch mode these are reported on the error stream and the session
    /// keeps going; anything else ends the session.
    pub fn is_pipeline_failure(&self) -> bool {
        matches!(
            self,
            Self::PackageNotFound { .. }
                | Self::CacheCopyFailed { .. }
                | Self::SymbolSynthesisFailed { .. }
                | Self::BuildFailed { .. }
                | Self::SymbolResolveFailed { .. }
                | Self::CommandFailed { .. }
                | Self::Io { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::PackageNotFound { .. } => {
                Some("Point --pkg at a directory containing a lib.rs crate root")
            }
            Self::CacheCopyFailed { .. } => {
                Some("Check that the cache directory (--cache-dir) is writable")
            }
            Self::SymbolResolveFailed { .. } => {
                Some("Export the value with #[no_mangle] or pass --generate-symbols")
            }
            Self::BuildFailed { .. } => {
                Some("Use --preserve-cache to inspect the sources that were compiled")
            }
            Self::ToolchainUnsupported { .. } => Some("Run: rustup update stable"),
            _ => None,
        }
    }
}
