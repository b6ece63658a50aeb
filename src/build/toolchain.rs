//! Compiler abstraction
//!
//! The builder only needs "turn this crate root into a loadable artifact at
//! this path". `Rustc` shells out to the system compiler; tests swap in
//! their own implementations.

use crate::config::schema::ToolchainConfig;
use crate::error::{MirrorError, MirrorResult};
use async_trait::async_trait;
use semver::Version;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Oldest compiler able to build synthesized symbols (`std::sync::LazyLock`)
pub const MIN_RUSTC_VERSION: Version = Version::new(1, 80, 0);

/// Max number of output lines to include in build error messages.
const BUILD_ERROR_TAIL_LINES: usize = 50;

/// Extract the useful tail of compiler output for error diagnostics.
pub(crate) fn build_error_output(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let total = lines.len();
    let tail: Vec<&str> = if total > BUILD_ERROR_TAIL_LINES {
        lines[total - BUILD_ERROR_TAIL_LINES..].to_vec()
    } else {
        lines
    };
    tail.join("\n")
}

/// One compilation request
#[derive(Debug, Clone)]
pub struct CompileRequest<'a> {
    /// Crate root to compile
    pub crate_root: &'a Path,

    /// Crate name passed to the compiler
    pub crate_name: &'a str,

    /// Where the artifact must be written
    pub output: &'a Path,
}

/// A compiler able to produce dynamically loadable artifacts
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Compile the request; a non-zero exit is `BuildFailed` with diagnostics
    async fn compile(&self, request: &CompileRequest<'_>) -> MirrorResult<()>;

    /// Human-readable toolchain name for logs
    fn name(&self) -> &'static str;
}

/// The system `rustc`
#[derive(Debug, Clone)]
pub struct Rustc {
    program: PathBuf,
    edition: String,
    extra_args: Vec<String>,
}

impl Rustc {
    /// `rustc` from `PATH`, edition 2021
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("rustc"),
            edition: "2021".to_string(),
            extra_args: vec![],
        }
    }

    /// Build from the `[toolchain]` config section
    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self {
            program: config.rustc.clone(),
            edition: config.edition.clone(),
            extra_args: config.args.clone(),
        }
    }

    /// Arguments for a request, in invocation order
    pub fn args(&self, request: &CompileRequest<'_>) -> Vec<String> {
        let mut args = vec![
            "--edition".to_string(),
            self.edition.clone(),
            "--crate-type".to_string(),
            super::declaration::ENTRYPOINT_KIND.to_string(),
            "--crate-name".to_string(),
            request.crate_name.to_string(),
            "-C".to_string(),
            "opt-level=0".to_string(),
            "-o".to_string(),
            request.output.display().to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(request.crate_root.display().to_string());
        args
    }

    /// Query the compiler version
    pub async fn version(&self) -> MirrorResult<Version> {
        let command = format!("{} --version", self.program.display());
        let output = Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| MirrorError::command_failed(&command, e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_version(&stdout).ok_or_else(|| {
            MirrorError::Internal(format!("unexpected `{}` output: {}", command, stdout.trim()))
        })
    }

    /// Fail unless the compiler is at least `MIN_RUSTC_VERSION`
    pub async fn ensure_supported(&self) -> MirrorResult<Version> {
        let version = self.version().await?;
        if version < MIN_RUSTC_VERSION {
            return Err(MirrorError::ToolchainUnsupported {
                found: version.to_string(),
                required: MIN_RUSTC_VERSION.to_string(),
            });
        }
        Ok(version)
    }
}

impl Default for Rustc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Toolchain for Rustc {
    async fn compile(&self, request: &CompileRequest<'_>) -> MirrorResult<()> {
        let args = self.args(request);
        debug!("Executing: {} {:?}", self.program.display(), args);

        let work_dir = request.crate_root.parent().unwrap_or_else(|| Path::new("."));
        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                MirrorError::build_failed(
                    work_dir,
                    format!("failed to run {}: {}", self.program.display(), e),
                )
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(MirrorError::build_failed(
                work_dir,
                build_error_output(&stdout, &stderr),
            ))
        }
    }

    fn name(&self) -> &'static str {
        "rustc"
    }
}

/// Parse `rustc 1.82.0 (f6e511eec 2024-10-15)` into a version
fn parse_version(output: &str) -> Option<Version> {
    let raw = output.split_whitespace().nth(1)?;
    // Nightly and beta builds carry a pre-release tag that would sort them
    // below the release they precede
    let core = raw.split('-').next()?;
    Version::parse(core).ok()
}
