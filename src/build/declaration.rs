//! Crate-type declaration rewriting
//!
//! Only a crate declared as `cdylib` can be built into a loadable artifact,
//! so the cached sources are switched over for the duration of a build.
//! `DeclarationGuard` pairs every rewrite with a restore: call `restore()`
//! to observe errors, and `Drop` puts the original bytes back on any path
//! that skipped it (early return, panic inside the compiler step).

use crate::error::{MirrorError, MirrorResult};
use crate::package::list_source_files;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;
use tracing::{debug, warn};

/// Crate type every build is switched to
pub const ENTRYPOINT_KIND: &str = "cdylib";

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^#!\[crate_type\s*=\s*"([A-Za-z_]+)"\][ \t\r]*$"#)
        .expect("declaration pattern is valid")
});

/// Find the crate type declared in a source file
pub fn declared_kind(source: &str) -> Option<&str> {
    DECLARATION
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Replace every declaration in `source` with one declaring `kind`
pub fn with_kind(source: &str, kind: &str) -> String {
    DECLARATION
        .replace_all(source, format!("#![crate_type = \"{}\"]", kind).as_str())
        .into_owned()
}

/// A file whose declaration was rewritten, with its original bytes
#[derive(Debug)]
struct RewrittenFile {
    path: PathBuf,
    original: Vec<u8>,
    original_kind: String,
}

/// Scoped rewrite of every declaration in a directory
#[derive(Debug)]
pub struct DeclarationGuard {
    files: Vec<RewrittenFile>,
    restored: bool,
}

impl DeclarationGuard {
    /// Rewrite the declaration of every source file in `dir` to `kind`.
    ///
    /// The crate root must carry a declaration; other files are rewritten
    /// only when they have one. A missing or unreadable root declaration is
    /// fatal for the run.
    pub async fn rewrite(dir: &Path, crate_root: &Path, kind: &str) -> MirrorResult<Self> {
        let files = list_source_files(dir)
            .await
            .map_err(|e| MirrorError::build_failed(dir, format!("listing sources: {}", e)))?;

        let mut guard = Self {
            files: Vec::with_capacity(files.len()),
            restored: false,
        };

        for path in files {
            let original = fs::read(&path).await.map_err(|e| {
                MirrorError::build_failed(dir, format!("reading {}: {}", path.display(), e))
            })?;
            let source = String::from_utf8(original.clone()).map_err(|_| {
                MirrorError::build_failed(dir, format!("{} is not valid UTF-8", path.display()))
            })?;

            let original_kind = match declared_kind(&source) {
                Some(found) => found.to_string(),
                None if path == crate_root => {
                    return Err(MirrorError::build_failed(
                        dir,
                        format!(
                            "no `#![crate_type = \"...\"]` declaration found when scanning {}",
                            path.display()
                        ),
                    ));
                }
                None => continue,
            };

            let rewritten = with_kind(&source, kind);
            guard.files.push(RewrittenFile {
                path: path.clone(),
                original,
                original_kind,
            });

            fs::write(&path, rewritten).await.map_err(|e| {
                MirrorError::build_failed(dir, format!("rewriting {}: {}", path.display(), e))
            })?;
        }

        debug!(
            "Rewrote {} declarations in {} to {}",
            guard.files.len(),
            dir.display(),
            kind
        );
        Ok(guard)
    }

    /// Paths rewritten by this guard together with their original kinds
    pub fn rewritten(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files
            .iter()
            .map(|f| (f.path.as_path(), f.original_kind.as_str()))
    }

    /// Put the original bytes back into every rewritten file.
    ///
    /// Every file is attempted even after a failure. Files that could not
    /// be restored stay with the guard and are retried once more on drop;
    /// the first failure is returned as `BuildFailed`.
    pub async fn restore(mut self) -> MirrorResult<()> {
        let mut first_error = None;
        let mut pending = Vec::new();

        for file in std::mem::take(&mut self.files) {
            if let Err(e) = fs::write(&file.path, &file.original).await {
                warn!("Failed to restore {}: {}", file.path.display(), e);
                if first_error.is_none() {
                    first_error = Some(MirrorError::build_failed(
                        file.path.clone(),
                        format!("restoring crate-type declaration: {}", e),
                    ));
                }
                pending.push(file);
            }
        }

        if let Some(e) = first_error {
            self.files = pending;
            return Err(e);
        }

        debug!("Restored all declarations");
        self.restored = true;
        Ok(())
    }
}

impl Drop for DeclarationGuard {
    fn drop(&mut self) {
        if self.restored {
            return;
        }

        for file in &self.files {
            if let Err(e) = std::fs::write(&file.path, &file.original) {
                warn!("Failed to restore {}: {}", file.path.display(), e);
            }
        }
    }
}
