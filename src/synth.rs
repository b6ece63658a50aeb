//! Symbol synthesis
//!
//! Types alone cannot be looked up in a compiled artifact, only values can.
//! For every requested type `T` the synthesizer writes an exported static
//! `X<T>` holding `T::default()` into the cached copy, so `User` becomes
//! resolvable as `XUser`.

use crate::error::{MirrorError, MirrorResult};
use crate::symbols::WILDCARD;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

/// Prefix applied to every synthesized symbol
pub const SYMBOL_PREFIX: &str = "X";

static IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("ident pattern is valid"));

static MODULE_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?mod[ \t]+([A-Za-z_][A-Za-z0-9_]*)[ \t]*;")
        .expect("module pattern is valid")
});

/// File modules declared by a crate root (`mod name;`), in order
pub fn declared_modules(root_source: &str) -> Vec<String> {
    let stripped = crate::build::exports::strip_block_comments(root_source);
    MODULE_DECL
        .captures_iter(&stripped)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Name of the synthesized symbol for a type
pub fn symbol_name(type_name: &str) -> String {
    format!("{}{}", SYMBOL_PREFIX, type_name)
}

/// Render the module declaring one exported instance per type.
///
/// Types are looked up in the crate root and in every sibling module, so a
/// type need not be re-exported from the root.
pub fn render_symbols(type_names: &[String], modules: &[String]) -> String {
    let mut out = String::from(
        "// DO NOT EDIT: generated by mirror\n\
         #![allow(non_upper_case_globals, dead_code, unused_imports)]\n\
         \n\
         use super::*;\n",
    );
    for module in modules {
        out.push_str(&format!("use super::{}::*;\n", module));
    }

    for name in type_names {
        out.push_str(&format!(
            "\n#[no_mangle]\npub static {sym}: ::std::sync::LazyLock<{ty}> =\n    \
             ::std::sync::LazyLock::new(<{ty} as ::core::default::Default>::default);\n",
            sym = symbol_name(name),
            ty = name,
        ));
    }

    out
}

/// Write the synthesized symbol module into `cache_dir` and register it
/// with the crate root copy.
///
/// Returns `type_names` with the symbol prefix applied, in the same order.
pub async fn synthesize(
    type_names: &[String],
    cache_dir: &Path,
    crate_root: &Path,
) -> MirrorResult<Vec<String>> {
    let failed = |reason: String| MirrorError::SymbolSynthesisFailed {
        path: cache_dir.to_path_buf(),
        reason,
    };

    if type_names.is_empty() {
        return Err(failed("no type names given".to_string()));
    }
    if type_names.len() == 1 && type_names[0] == WILDCARD {
        return Err(failed(format!(
            "'{}' cannot be combined with symbol generation",
            WILDCARD
        )));
    }
    if let Some(bad) = type_names.iter().find(|n| !IDENT.is_match(n)) {
        return Err(failed(format!("'{}' is not a valid type name", bad)));
    }

    let root_source = fs::read_to_string(crate_root)
        .await
        .map_err(|e| failed(format!("reading {}: {}", crate_root.display(), e)))?;
    let siblings = declared_modules(&root_source);

    let module = format!("mirror_symbols_{}", Uuid::new_v4().simple());
    let file = cache_dir.join(format!("{}.rs", module));
    debug!(
        "Writing {} synthesized symbols to {} (importing {} modules)",
        type_names.len(),
        file.display(),
        siblings.len()
    );

    fs::write(&file, render_symbols(type_names, &siblings))
        .await
        .map_err(|e| failed(format!("writing {}: {}", file.display(), e)))?;

    let mut root = fs::OpenOptions::new()
        .append(true)
        .open(crate_root)
        .await
        .map_err(|e| failed(format!("opening {}: {}", crate_root.display(), e)))?;
    root.write_all(format!("\nmod {};\n", module).as_bytes())
        .await
        .map_err(|e| failed(format!("registering module in {}: {}", crate_root.display(), e)))?;
    root.flush()
        .await
        .map_err(|e| failed(format!("flushing {}: {}", crate_root.display(), e)))?;

    Ok(type_names.iter().map(|n| symbol_name(n)).collect())
}
