//! Package resolution
//!
//! A package is a flat directory of `*.rs` files with a `lib.rs` crate root.
//! Subdirectories are never followed; they may hold other packages.

use crate::error::{MirrorError, MirrorResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;
use tracing::debug;

/// File name of the crate root every package must contain
pub const CRATE_ROOT: &str = "lib.rs";

/// Extension of the source files that take part in a build
pub const SOURCE_EXTENSION: &str = "rs";

static CRATE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^#!\[crate_name\s*=\s*"([A-Za-z_][A-Za-z0-9_]*)"\]\s*$"#)
        .expect("crate_name pattern is valid")
});

/// A resolved source package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Import identity (the crate name the package compiles under)
    pub import_path: String,

    /// Human-readable name (the directory name)
    pub name: String,

    /// Canonical package directory
    pub dir: PathBuf,

    /// Absolute paths of every source file, sorted
    pub files: Vec<PathBuf>,
}

impl Package {
    /// Path of the crate root inside the package directory
    pub fn crate_root(&self) -> PathBuf {
        self.dir.join(CRATE_ROOT)
    }
}

/// Resolve the package at `path`.
///
/// Fails with `PackageNotFound` when the path is missing, not a directory,
/// holds no source files, or has no crate root.
pub async fn resolve_package(path: &Path) -> MirrorResult<Package> {
    let not_found = |reason: &str| MirrorError::PackageNotFound {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let dir = fs::canonicalize(path)
        .await
        .map_err(|e| not_found(&e.to_string()))?;

    let metadata = fs::metadata(&dir)
        .await
        .map_err(|e| not_found(&e.to_string()))?;
    if !metadata.is_dir() {
        return Err(not_found("not a directory"));
    }

    let files = list_source_files(&dir)
        .await
        .map_err(|e| not_found(&e.to_string()))?;
    if files.is_empty() {
        return Err(not_found("no .rs source files"));
    }

    let root = dir.join(CRATE_ROOT);
    if !files.contains(&root) {
        return Err(not_found("missing lib.rs crate root"));
    }

    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let root_source = fs::read_to_string(&root)
        .await
        .map_err(|e| not_found(&format!("reading crate root: {}", e)))?;

    let import_path = match CRATE_NAME.captures(&root_source) {
        Some(caps) => caps[1].to_string(),
        None => crate_ident(&name).ok_or_else(|| {
            not_found(&format!("cannot derive a crate name from '{}'", name))
        })?,
    };

    debug!(
        "Resolved package {} ({}) with {} files",
        name,
        import_path,
        files.len()
    );

    Ok(Package {
        import_path,
        name,
        dir,
        files,
    })
}

/// List the source files directly inside `dir`, sorted
pub async fn list_source_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        // Subdirectories may contain other packages
        if entry.file_type().await?.is_dir() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Normalize a directory name into a crate identifier
fn crate_ident(name: &str) -> Option<String> {
    let ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    match ident.chars().next() {
        None => None,
        Some(c) if c.is_ascii_digit() => Some(format!("_{}", ident)),
        Some(_) => Some(ident),
    }
}
