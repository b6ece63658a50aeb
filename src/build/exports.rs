//! Export manifest
//!
//! Shared-library loaders can look a name up but cannot list what a library
//! exports. The manifest is collected from the sources that went into the
//! build: every `#[no_mangle]` static is an exported symbol.
//!
//! Block comments are blanked out before matching. `#[cfg(...)]` is not
//! evaluated, so a static disabled by cfg still lands in the manifest and a
//! wildcard request against it fails to resolve.

use crate::error::{MirrorError, MirrorResult};
use crate::package::list_source_files;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;
use tokio::fs;

static EXPORTED_STATIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*#\[(?:unsafe\(no_mangle\)|no_mangle)\]\s*(?:#\[[^\]]*\]\s*)*pub\s+static\s+(?:mut\s+)?([A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("export pattern is valid")
});

/// Names of the exported statics declared in `source`
pub fn exported_statics(source: &str) -> impl Iterator<Item = &str> {
    EXPORTED_STATIC
        .captures_iter(source)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Blank out block comments (nested ones included), keeping line breaks.
///
/// String and char literals are skipped so a `"/*"` inside them does not
/// open a comment. Raw strings are not recognized.
pub fn strip_block_comments(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut depth = 0usize;
    let mut in_line_comment = false;
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if depth > 0 {
            match (c, next) {
                ('/', Some('*')) => {
                    depth += 1;
                    i += 1;
                }
                ('*', Some('/')) => {
                    depth -= 1;
                    i += 1;
                    if depth == 0 {
                        out.push(' ');
                    }
                }
                ('\n', _) => out.push('\n'),
                _ => {}
            }
        } else if in_line_comment {
            in_line_comment = c != '\n';
            out.push(c);
        } else if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = next {
                        out.push(escaped);
                        i += 1;
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
        } else {
            match (c, next) {
                ('/', Some('*')) => {
                    depth = 1;
                    i += 1;
                }
                ('/', Some('/')) => {
                    in_line_comment = true;
                    out.push(c);
                }
                ('"', _) => {
                    in_string = true;
                    out.push(c);
                }
                // '"' and '\'' style char literals
                ('\'', Some('"')) | ('\'', Some('\\')) => {
                    let end = (i + if next == Some('"') { 3 } else { 4 }).min(chars.len());
                    out.extend(&chars[i..end]);
                    i = end;
                    continue;
                }
                _ => out.push(c),
            }
        }

        i += 1;
    }

    out
}

/// Collect the exported statics of every source file in `dir`, sorted
pub async fn scan_exports(dir: &Path) -> MirrorResult<Vec<String>> {
    let files = list_source_files(dir)
        .await
        .map_err(|e| MirrorError::build_failed(dir, format!("listing sources: {}", e)))?;

    let mut names = BTreeSet::new();
    for file in files {
        let source = fs::read_to_string(&file)
            .await
            .map_err(|e| {
                MirrorError::build_failed(dir, format!("reading {}: {}", file.display(), e))
            })?;
        let source = strip_block_comments(&source);
        names.extend(exported_statics(&source).map(str::to_string));
    }

    Ok(names.into_iter().collect())
}
