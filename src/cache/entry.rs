//! Cache entry state

use crate::error::{MirrorError, MirrorResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Format bytes as human-readable size (e.g., "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// An isolated working copy of a package
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Unique directory holding the copy
    pub dir: PathBuf,

    /// Display name of the package that was copied
    pub package: String,

    /// Keep the directory after the run for inspection
    pub preserve: bool,
}

impl CacheEntry {
    /// Path of a file inside the entry
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.join(name)
    }

    /// Release the entry at the end of a run.
    ///
    /// Removes the directory unless the entry is preserved. Returns whether
    /// the directory was removed.
    pub async fn release(&self) -> bool {
        if self.preserve {
            debug!("Preserving cache dir: {}", self.dir.display());
            return false;
        }

        match self.remove().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to remove cache dir {}: {}", self.dir.display(), e);
                false
            }
        }
    }

    /// Remove the entry directory regardless of the preserve flag
    pub async fn remove(&self) -> MirrorResult<()> {
        debug!("Removing cache dir: {}", self.dir.display());
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MirrorError::io(
                format!("removing cache dir {}", self.dir.display()),
                e,
            )),
        }
    }
}

/// Summary of an entry found on disk (preserved or left behind)
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryInfo {
    /// Entry directory name
    pub id: String,

    /// Full path
    pub path: PathBuf,

    /// Number of files directly inside the entry
    pub files: usize,

    /// Total size of those files in bytes
    pub size_bytes: u64,

    /// Last modification time of the directory
    pub modified_at: Option<DateTime<Utc>>,
}

impl CacheEntryInfo {
    /// Inspect an entry directory
    pub async fn inspect(path: &Path) -> MirrorResult<Self> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| MirrorError::io(format!("reading {}", path.display()), e))?;

        let mut files = 0;
        let mut size_bytes = 0;
        let mut entries = fs::read_dir(path)
            .await
            .map_err(|e| MirrorError::io(format!("listing {}", path.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MirrorError::io(format!("listing {}", path.display()), e))?
        {
            if let Ok(meta) = entry.metadata().await {
                if meta.is_file() {
                    files += 1;
                    size_bytes += meta.len();
                }
            }
        }

        Ok(Self {
            id: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            files,
            size_bytes,
            modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }
}
