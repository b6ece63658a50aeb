//! Cache root management
//!
//! The cache root is shared by every loader in the process (and by other
//! processes using the same directory). No locking is involved: each copy
//! claims a fresh UUID-named directory with an exclusive `create_dir`, and a
//! collision simply draws a new name.

use crate::cache::entry::{CacheEntry, CacheEntryInfo};
use crate::error::{MirrorError, MirrorResult};
use crate::package::Package;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default cache root, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = ".mirror";

/// Attempts at drawing an unused entry name before giving up
const MAX_NAME_ATTEMPTS: usize = 8;

/// Whether a directory name is one drawn by `create_entry`
fn is_entry_name(name: &str) -> bool {
    Uuid::try_parse(name)
        .map(|id| id.simple().to_string() == name)
        .unwrap_or(false)
}

/// Owns a cache root directory and the entries created in it
#[derive(Debug, Clone)]
pub struct CacheManager {
    root: PathBuf,
}

impl CacheManager {
    /// Create a manager for the given root (made absolute, not created yet)
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        Self { root }
    }

    /// The cache root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy the package's flat source files into a fresh entry.
    ///
    /// A partially copied entry is removed before the error is returned,
    /// unless `preserve` is set.
    pub async fn copy_to_cache(&self, pkg: &Package, preserve: bool) -> MirrorResult<CacheEntry> {
        let entry = self.create_entry(&pkg.name, preserve).await?;
        debug!("Copying {} -> {}", pkg.dir.display(), entry.dir.display());

        if let Err(e) = copy_files(&pkg.files, &entry.dir).await {
            entry.release().await;
            return Err(MirrorError::CacheCopyFailed {
                path: entry.dir.clone(),
                source: e,
            });
        }

        Ok(entry)
    }

    /// Claim a new, empty entry directory under the root
    async fn create_entry(&self, package: &str, preserve: bool) -> MirrorResult<CacheEntry> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| MirrorError::CacheCopyFailed {
                path: self.root.clone(),
                source: e,
            })?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let dir = self.root.join(Uuid::new_v4().simple().to_string());

            match fs::create_dir(&dir).await {
                Ok(()) => {
                    debug!("Created cache dir: {}", dir.display());
                    return Ok(CacheEntry {
                        dir,
                        package: package.to_string(),
                        preserve,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    warn!("Cache dir name collision, drawing again: {}", dir.display());
                }
                Err(e) => {
                    return Err(MirrorError::CacheCopyFailed { path: dir, source: e });
                }
            }
        }

        Err(MirrorError::CacheCopyFailed {
            path: self.root.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "could not find an unused cache directory name",
            ),
        })
    }

    /// List entries currently on disk.
    ///
    /// Only UUID-named directories count; anything else under the root was
    /// not created here and is left alone.
    pub async fn entries(&self) -> MirrorResult<Vec<CacheEntryInfo>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }

        let mut dirs = fs::read_dir(&self.root)
            .await
            .map_err(|e| MirrorError::io(format!("listing {}", self.root.display()), e))?;

        let mut infos = Vec::new();
        while let Some(entry) = dirs
            .next_entry()
            .await
            .map_err(|e| MirrorError::io(format!("listing {}", self.root.display()), e))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            let owned = entry.file_name().to_str().is_some_and(is_entry_name);
            if is_dir && owned {
                infos.push(CacheEntryInfo::inspect(&entry.path()).await?);
            }
        }

        infos.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        Ok(infos)
    }

    /// Remove every entry, returning how many were removed
    pub async fn clear(&self) -> MirrorResult<usize> {
        let entries = self.entries().await?;

        for entry in &entries {
            fs::remove_dir_all(&entry.path).await.map_err(|e| {
                MirrorError::io(format!("removing cache dir {}", entry.path.display()), e)
            })?;
        }

        info!("Cleared {} cache entries from {}", entries.len(), self.root.display());
        Ok(entries.len())
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

async fn copy_files(files: &[PathBuf], dest: &Path) -> std::io::Result<()> {
    for file in files {
        let name = file.file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} has no file name", file.display()),
            )
        })?;
        fs::copy(file, dest.join(name)).await?;
    }
    Ok(())
}
