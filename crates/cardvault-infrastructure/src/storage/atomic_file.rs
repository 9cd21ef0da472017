//! Atomic file writes.
//!
//! Writes go to a temporary sibling, are fsynced, then renamed over the target.
//! A reader therefore sees either the old or the new content, never a mix.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use cardvault_core::error::{CardvaultError, Result};

/// Replaces `path` with `contents` atomically, creating parent directories.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    write_atomic_with_mode(path, contents, None)
}

/// Like [`write_atomic`], but the file is owner read/write only from the
/// moment it is created (Unix). Used for credentials.
pub fn write_atomic_private(path: &Path, contents: &[u8]) -> Result<()> {
    write_atomic_with_mode(path, contents, Some(0o600))
}

fn write_atomic_with_mode(path: &Path, contents: &[u8], mode: Option<u32>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                CardvaultError::io(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let tmp_path = temp_path(path)?;
    // A stale temp file would keep its old permissions.
    match fs::remove_file(&tmp_path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(CardvaultError::io(format!(
                "Failed to remove stale temp file '{}': {}",
                tmp_path.display(),
                e
            )));
        }
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if let Some(mode) = mode {
            options.mode(mode);
        }
    }
    #[cfg(not(unix))]
    let _ = mode;
    let mut tmp_file = options.open(&tmp_path).map_err(|e| {
        CardvaultError::io(format!(
            "Failed to create temp file '{}': {}",
            tmp_path.display(),
            e
        ))
    })?;

    tmp_file.write_all(contents).map_err(|e| {
        CardvaultError::io(format!(
            "Failed to write to temp file '{}': {}",
            tmp_path.display(),
            e
        ))
    })?;

    // Ensure data is written to disk
    tmp_file.sync_all().map_err(|e| {
        CardvaultError::io(format!(
            "Failed to sync temp file '{}': {}",
            tmp_path.display(),
            e
        ))
    })?;
    drop(tmp_file);

    fs::rename(&tmp_path, path).map_err(|e| {
        CardvaultError::io(format!(
            "Failed to rename temp file '{}' to '{}': {}",
            tmp_path.display(),
            path.display(),
            e
        ))
    })
}

fn temp_path(path: &Path) -> Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        CardvaultError::io(format!("Path has no file name: '{}'", path.display()))
    })?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}
