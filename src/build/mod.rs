//! Module builder
//!
//! Turns a cache entry into a loadable artifact:
//! 1. Rewrite every crate-type declaration to `cdylib`
//! 2. Compile the crate root with the configured toolchain
//! 3. Restore the declarations, whatever the compiler did
//! 4. Collect the export manifest

pub mod declaration;
pub mod exports;
pub mod toolchain;

pub use declaration::{DeclarationGuard, ENTRYPOINT_KIND};
pub use exports::scan_exports;
pub use toolchain::{CompileRequest, Rustc, Toolchain, MIN_RUSTC_VERSION};

use crate::error::{MirrorError, MirrorResult};
use crate::package::CRATE_ROOT;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// The loadable output of one build
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    /// Shared library path
    pub path: PathBuf,

    /// Cache directory the artifact was built from
    pub cache_dir: PathBuf,

    /// Exported statics, used for wildcard resolution
    pub exports: Vec<String>,
}

impl CompiledArtifact {
    /// Delete the artifact from disk
    pub async fn remove(self) -> MirrorResult<()> {
        debug!("Removing artifact: {}", self.path.display());
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MirrorError::io(
                format!("removing artifact {}", self.path.display()),
                e,
            )),
        }
    }
}

/// Unique artifact file name for a crate
pub fn artifact_file_name(crate_name: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!(
        "{}{}-{}.{}",
        std::env::consts::DLL_PREFIX,
        crate_name,
        &id[..12],
        std::env::consts::DLL_EXTENSION
    )
}

/// Builds cache entries with a toolchain
#[derive(Clone)]
pub struct ModuleBuilder {
    toolchain: Arc<dyn Toolchain>,
}

impl ModuleBuilder {
    /// Create a builder using the given toolchain
    pub fn new(toolchain: Arc<dyn Toolchain>) -> Self {
        Self { toolchain }
    }

    /// The toolchain in use
    pub fn toolchain(&self) -> &dyn Toolchain {
        &*self.toolchain
    }

    /// Build the crate in `cache_dir` into an artifact inside that directory
    pub async fn build(&self, cache_dir: &Path, crate_name: &str) -> MirrorResult<CompiledArtifact> {
        let crate_root = cache_dir.join(CRATE_ROOT);
        let output = cache_dir.join(artifact_file_name(crate_name));

        let guard = DeclarationGuard::rewrite(cache_dir, &crate_root, ENTRYPOINT_KIND).await?;

        debug!(
            "Compiling {} with {} -> {}",
            crate_root.display(),
            self.toolchain.name(),
            output.display()
        );
        let compiled = self
            .toolchain
            .compile(&CompileRequest {
                crate_root: &crate_root,
                crate_name,
                output: &output,
            })
            .await;

        let restored = guard.restore().await;

        let outcome = match (compiled, restored) {
            (Ok(()), restored) => restored,
            (Err(e), Ok(())) => Err(e),
            (Err(compile), Err(restore)) => Err(with_restore_failure(compile, restore)),
        };

        if let Err(e) = outcome {
            if let Err(remove_err) = fs::remove_file(&output).await {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", output.display(), remove_err);
                }
            }
            return Err(e);
        }

        let exports = scan_exports(cache_dir).await;
        let artifact = CompiledArtifact {
            path: output,
            cache_dir: cache_dir.to_path_buf(),
            exports: vec![],
        };
        match exports {
            Ok(exports) => Ok(CompiledArtifact { exports, ..artifact }),
            Err(e) => {
                if let Err(remove_err) = artifact.remove().await {
                    warn!("{}", remove_err);
                }
                Err(e)
            }
        }
    }
}

/// Fold a failed restore into the compile error it happened after
fn with_restore_failure(compile: MirrorError, restore: MirrorError) -> MirrorError {
    match (compile, restore) {
        (
            MirrorError::BuildFailed { path, diagnostics },
            MirrorError::BuildFailed {
                diagnostics: restore, ..
            },
        ) => MirrorError::BuildFailed {
            path,
            diagnostics: format!("{}\n{}", diagnostics, restore),
        },
        (compile, restore) => {
            warn!("{}", restore);
            compile
        }
    }
}

impl std::fmt::Debug for ModuleBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleBuilder")
            .field("toolchain", &self.toolchain.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const ROOT: &str = "#![crate_type = \"lib\"]\n\n#[no_mangle]\npub static XUser: u8 = 0;\n";

    /// Records the root it saw and optionally fails or panics
    struct FakeToolchain {
        seen: Mutex<Option<String>>,
        fail: bool,
    }

    impl FakeToolchain {
        fn new(fail: bool) -> Self {
            Self {
                seen: Mutex::new(None),
                fail,
            }
        }
    }

    #[async_trait]
    impl Toolchain for FakeToolchain {
        async fn compile(&self, request: &CompileRequest<'_>) -> MirrorResult<()> {
            let source = std::fs::read_to_string(request.crate_root).unwrap();
            *self.seen.lock().unwrap() = Some(source);

            if self.fail {
                return Err(MirrorError::build_failed(
                    request.crate_root,
                    "error: expected item",
                ));
            }
            std::fs::write(request.output, b"artifact").unwrap();
            Ok(())
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    struct PanickingToolchain;

    #[async_trait]
    impl Toolchain for PanickingToolchain {
        async fn compile(&self, _request: &CompileRequest<'_>) -> MirrorResult<()> {
            panic!("compiler exploded");
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    fn cache_dir() -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("lib.rs"), ROOT).unwrap();
        temp
    }

    #[test]
    fn artifact_names_are_unique() {
        let a = artifact_file_name("user");
        let b = artifact_file_name("user");
        assert_ne!(a, b);
        assert!(a.contains("user-"));
        assert!(a.ends_with(std::env::consts::DLL_EXTENSION));
    }

    #[tokio::test]
    async fn compiles_with_entrypoint_declaration() {
        let temp = cache_dir();
        let toolchain = Arc::new(FakeToolchain::new(false));
        let builder = ModuleBuilder::new(toolchain.clone());

        let artifact = builder.build(temp.path(), "user").await.unwrap();

        let seen = toolchain.seen.lock().unwrap().clone().unwrap();
        assert!(seen.starts_with("#![crate_type = \"cdylib\"]"));
        assert_eq!(std::fs::read_to_string(temp.path().join("lib.rs")).unwrap(), ROOT);
        assert!(artifact.path.exists());
        assert_eq!(artifact.exports, vec!["XUser".to_string()]);

        let path = artifact.path.clone();
        artifact.remove().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn failed_build_restores_declarations() {
        let temp = cache_dir();
        let builder = ModuleBuilder::new(Arc::new(FakeToolchain::new(true)));

        let err = builder.build(temp.path(), "user").await.unwrap_err();

        assert!(matches!(err, MirrorError::BuildFailed { .. }));
        assert_eq!(std::fs::read_to_string(temp.path().join("lib.rs")).unwrap(), ROOT);
    }

    /// Swaps `a.rs` for a directory so restoring it fails, then fails itself
    struct SabotagingToolchain;

    #[async_trait]
    impl Toolchain for SabotagingToolchain {
        async fn compile(&self, request: &CompileRequest<'_>) -> MirrorResult<()> {
            let module = request.crate_root.with_file_name("a.rs");
            std::fs::remove_file(&module).unwrap();
            std::fs::create_dir(&module).unwrap();
            Err(MirrorError::build_failed(request.crate_root, "boom"))
        }

        fn name(&self) -> &'static str {
            "sabotaging"
        }
    }

    #[tokio::test]
    async fn failed_restore_of_one_file_restores_the_rest() {
        let temp = TempDir::new().unwrap();
        let root_source = "#![crate_type = \"lib\"]\nmod a;\n";
        std::fs::write(temp.path().join("lib.rs"), root_source).unwrap();
        std::fs::write(temp.path().join("a.rs"), "#![crate_type = \"lib\"]\n").unwrap();

        let err = ModuleBuilder::new(Arc::new(SabotagingToolchain))
            .build(temp.path(), "user")
            .await
            .unwrap_err();

        match err {
            MirrorError::BuildFailed { diagnostics, .. } => {
                assert!(diagnostics.contains("boom"));
                assert!(diagnostics.contains("restoring"));
            }
            other => panic!("expected BuildFailed, got {:?}", other),
        }
        assert_eq!(
            std::fs::read_to_string(temp.path().join("lib.rs")).unwrap(),
            root_source
        );
    }

    #[tokio::test]
    async fn panicking_compiler_still_restores() {
        let temp = cache_dir();
        let dir = temp.path().to_path_buf();

        let result = tokio::spawn(async move {
            ModuleBuilder::new(Arc::new(PanickingToolchain))
                .build(&dir, "user")
                .await
        })
        .await;

        assert!(result.unwrap_err().is_panic());
        assert_eq!(std::fs::read_to_string(temp.path().join("lib.rs")).unwrap(), ROOT);
    }
}
