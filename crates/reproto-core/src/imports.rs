//! Import path rewriting.
//!
//! Descriptor names double as paths under the output root. Imports are
//! rewritten relative to the importing file's directory so the generated
//! tree stays portable wherever the output root ends up mounted.

use crate::error::{Error, Result};
use std::path::PathBuf;

fn segments(name: &str) -> Vec<&str> {
    name.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect()
}

/// Computes the import path from `importer` to `dependency`, both given as
/// descriptor names relative to the output root.
///
/// Walks upward from the importer's directory, one `../` per level, until
/// the dependency is a descendant of the current directory.
///
/// ```
/// use reproto_core::imports::relative_import;
///
/// assert_eq!(relative_import("a/b/x.proto", "c/y.proto"), "../../c/y.proto");
/// assert_eq!(relative_import("a/x.proto", "a/sub/y.proto"), "sub/y.proto");
/// ```
pub fn relative_import(importer: &str, dependency: &str) -> String {
    let target = segments(dependency);
    let mut current = segments(importer);
    current.pop();

    let mut path = String::new();
    while !target.starts_with(&current) {
        path.push_str("../");
        current.pop();
    }

    path.push_str(&target[current.len()..].join("/"));
    path
}

/// Checks that a descriptor name stays inside the output root and returns
/// it as a relative path.
pub fn output_path(name: &str) -> Result<PathBuf> {
    let escapes = name.is_empty()
        || name.starts_with('/')
        || name.starts_with('\\')
        || name.contains(':')
        || name.split(|c: char| c == '/' || c == '\\').any(|s| s == "..");
    let parts = segments(name);
    if escapes || parts.is_empty() {
        return Err(Error::path_traversal(name));
    }

    Ok(parts.into_iter().collect())
}
