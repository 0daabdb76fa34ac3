//! Finding the per-duration tables of an archive.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Recursively list files under `dir` with the given extension, sorted by
/// path. Paths in `exclude` are skipped.
pub fn discover_tables(dir: &Path, extension: &str, exclude: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("input directory {:?} does not exist", dir);
    }

    let excluded: Vec<PathBuf> = exclude
        .iter()
        .filter_map(|p| p.canonicalize().ok())
        .collect();

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to list {:?}", dir))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case(extension));
        if !matches {
            continue;
        }

        if let Ok(canonical) = path.canonicalize() {
            if excluded.contains(&canonical) {
                debug!(path = %path.display(), "Skipping excluded file");
                continue;
            }
        }

        files.push(path.to_path_buf());
    }

    files.sort();

    info!(
        dir = %dir.display(),
        extension = %extension,
        files = files.len(),
        "Discovered tables"
    );

    Ok(files)
}
