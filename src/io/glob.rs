//! File listing for the `list_files` source.
//!
//! Files are matched with standard glob patterns and always returned in
//! sorted order so that a listing, and therefore a recorded position into
//! it, is deterministic across runs.

use anyhow::{Context, Result, bail};
use glob::glob;
use std::path::{Path, PathBuf};

/// Expand a glob pattern into a sorted vector of matching file paths.
///
/// Directories are skipped.
///
/// # Errors
///
/// Returns an error if the pattern is invalid or a matched entry cannot be
/// read. No matches is an empty vector, not an error.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;

    let mut result = Vec::new();
    for entry in paths {
        let path =
            entry.with_context(|| format!("error reading glob entry for pattern: {pattern}"))?;
        if path.is_file() {
            result.push(path);
        }
    }

    result.sort();

    Ok(result)
}

/// List the files under `root`, recursively, whose file name matches
/// `pattern` (any file name when `None`).
///
/// A `root` naming a file lists just that file.
///
/// # Errors
///
/// Returns an error if `root` does not exist or the pattern is invalid.
pub fn list_files(root: &Path, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        bail!("'{}' does not exist", root.display());
    }

    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let escaped = glob::Pattern::escape(&root.to_string_lossy());
    let full = format!("{escaped}/**/{}", pattern.unwrap_or("*"));

    expand_glob(&full)
}
