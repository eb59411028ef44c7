// src/sync/cleaner.rs

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::progress::SyncProgress;
use crate::errorlog::ErrorLog;

/// Lists regular files directly inside `local_dir` whose names are absent from
/// `remote_names`. Sub-directories and the sentinel file are never reported.
pub fn find_extra_files(
    local_dir: &Path,
    remote_names: &HashSet<String>,
    sentinel_file: &str,
) -> Result<Vec<PathBuf>> {
    let mut extra_files = Vec::new();

    if !local_dir.exists() {
        log::debug!("Cleaner: {} does not exist, nothing to scan.", local_dir.display());
        return Ok(extra_files);
    }

    for entry in WalkDir::new(local_dir).min_depth(1).max_depth(1) {
        let entry = entry
            .with_context(|| format!("Failed to read directory {}", local_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name == sentinel_file {
            continue;
        }
        if !remote_names.contains(name.as_ref()) {
            log::debug!("Cleaner: Found extra file: {}", entry.path().display());
            extra_files.push(entry.path().to_path_buf());
        }
    }

    Ok(extra_files)
}

/// Deletes every extra file found by [`find_extra_files`]. A failed removal is
/// logged and the sweep carries on. Returns the number of files removed.
pub fn sweep_obsolete_files(
    local_dir: &Path,
    remote_names: &HashSet<String>,
    sentinel_file: &str,
    progress: &SyncProgress,
    errors: &dyn ErrorLog,
) -> Result<usize> {
    let extra_files = find_extra_files(local_dir, remote_names, sentinel_file)?;
    let mut deleted = 0;

    for file_path in &extra_files {
        match std::fs::remove_file(file_path) {
            Ok(()) => {
                log::info!("Cleaner: Deleted {}", file_path.display());
                progress.increment_deleted();
                deleted += 1;
            }
            Err(e) => {
                errors.log(&format!("Failed to remove {}: {}", file_path.display(), e));
            }
        }
    }

    Ok(deleted)
}
