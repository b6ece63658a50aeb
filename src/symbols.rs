//! Symbol resolution from compiled artifacts
//!
//! An artifact is opened once per run; every resolved `Symbol` keeps a
//! shared handle to the library so its address stays valid after the
//! artifact file itself is deleted.

use crate::build::CompiledArtifact;
use crate::error::{MirrorError, MirrorResult};
use libloading::Library;
use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::Arc;
use tracing::debug;

/// Sole symbol name requesting every export of the artifact
pub const WILDCARD: &str = "all";

/// Whether `names` is the wildcard request
pub fn is_wildcard(names: &[String]) -> bool {
    names.len() == 1 && names[0] == WILDCARD
}

/// An opened artifact
pub struct LoadedLibrary {
    library: Library,
    path: PathBuf,
}

impl LoadedLibrary {
    /// Open the shared library at `path`
    pub fn open(path: &Path) -> MirrorResult<Self> {
        // SAFETY: the artifact was just built from the target package; running
        // its initializers is the price of loading it at all.
        let library = unsafe { Library::new(path) }.map_err(|e| MirrorError::SymbolResolveFailed {
            artifact: path.to_path_buf(),
            name: String::new(),
            reason: format!("opening artifact: {}", e),
        })?;

        Ok(Self {
            library,
            path: path.to_path_buf(),
        })
    }

    /// Path the library was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Address of the exported symbol `name`
    fn address(&self, name: &str) -> MirrorResult<NonNull<c_void>> {
        let failed = |reason: String| MirrorError::SymbolResolveFailed {
            artifact: self.path.clone(),
            name: name.to_string(),
            reason,
        };

        // SAFETY: the symbol is only read as an address, never called or
        // dereferenced here.
        let symbol = unsafe { self.library.get::<*mut c_void>(name.as_bytes()) }
            .map_err(|e| failed(e.to_string()))?;

        NonNull::new(*symbol).ok_or_else(|| failed("symbol resolved to null".to_string()))
    }
}

impl fmt::Debug for LoadedLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedLibrary")
            .field("path", &self.path)
            .finish()
    }
}

/// A named value resolved inside a compiled artifact
#[derive(Clone)]
pub struct Symbol {
    name: String,
    address: NonNull<c_void>,
    library: Arc<LoadedLibrary>,
}

// SAFETY: a symbol is an immutable address inside a library that stays
// mapped for as long as any `Symbol` holds the `Arc`.
unsafe impl Send for Symbol {}
unsafe impl Sync for Symbol {}

impl Symbol {
    /// Symbol name as exported
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw address of the exported value
    pub fn address(&self) -> *const c_void {
        self.address.as_ptr()
    }

    /// Artifact path the symbol was resolved from
    pub fn artifact(&self) -> &Path {
        self.library.path()
    }

    /// View the exported value as `T`.
    ///
    /// # Safety
    ///
    /// `T` must be exactly the type the artifact declares for this symbol,
    /// with a layout identical between the artifact and the caller.
    pub unsafe fn get<T>(&self) -> &T {
        &*(self.address.as_ptr() as *const T)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Symbol")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("artifact", &self.library.path)
            .finish()
    }
}

/// Resolve `names` in the artifact.
///
/// The wildcard request resolves every name in the artifact's export
/// manifest. Any missing name fails the whole call.
pub fn resolve(artifact: &CompiledArtifact, names: &[String]) -> MirrorResult<Vec<Symbol>> {
    let library = Arc::new(LoadedLibrary::open(&artifact.path)?);

    let names: &[String] = if is_wildcard(names) {
        debug!(
            "Resolving all {} exports of {}",
            artifact.exports.len(),
            artifact.path.display()
        );
        &artifact.exports
    } else {
        names
    };

    let symbols = names
        .iter()
        .map(|name| {
            let address = library.address(name)?;
            debug!("Resolved {} at {:p}", name, address);
            Ok(Symbol {
                name: name.clone(),
                address,
                library: Arc::clone(&library),
            })
        })
        .collect::<MirrorResult<Vec<_>>>()?;

    Ok(symbols)
}
