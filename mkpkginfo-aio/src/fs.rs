/*
File: mkpkginfo-aio/src/fs.rs
Purpose: Synchronous filesystem measurements and whole-document reads.
*/
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use mkpkginfo_common::error::{MkPkgInfoError, Result};
use tracing::{debug, error};
use walkdir::WalkDir;

/// On-disk size of an installer item in bytes.
///
/// A regular file reports its own length. A directory reports the sum of the
/// `lstat` sizes of every regular file below it; symbolic links are neither
/// followed nor counted.
pub fn tree_size_bytes(path: &Path) -> Result<u64> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_file() {
        return Ok(meta.len());
    }
    if !meta.is_dir() {
        return Ok(0);
    }

    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(|e| {
            error!("Failed walking {}: {}", path.display(), e);
            MkPkgInfoError::Io(Arc::new(
                e.into_io_error()
                    .unwrap_or_else(|| io::Error::other("filesystem loop while walking")),
            ))
        })?;
        if entry.file_type().is_file() {
            total += entry.metadata().map_err(|e| {
                MkPkgInfoError::Io(Arc::new(
                    e.into_io_error()
                        .unwrap_or_else(|| io::Error::other("metadata unavailable")),
                ))
            })?
            .len();
        }
    }
    debug!("Total size of {}: {} bytes", path.display(), total);
    Ok(total)
}

/// True when `path` is a regular file, without following symlinks.
pub fn is_regular_file(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.is_file())
}

/// Reads a script verbatim. Scripts larger than `limit` bytes or not valid
/// UTF-8 are rejected as usage errors, as is a path that cannot be read.
pub fn read_script(path: &Path, limit: u64) -> Result<String> {
    debug!("Reading script: {}", path.display());
    let meta = fs::metadata(path).map_err(|e| {
        MkPkgInfoError::Usage(format!("Could not read script {}: {}", path.display(), e))
    })?;
    if meta.len() > limit {
        return Err(MkPkgInfoError::Usage(format!(
            "Script {} is {} bytes, larger than the {} byte limit",
            path.display(),
            meta.len(),
            limit
        )));
    }
    let bytes = fs::read(path).map_err(|e| {
        MkPkgInfoError::Usage(format!("Could not read script {}: {}", path.display(), e))
    })?;
    String::from_utf8(bytes).map_err(|_| {
        MkPkgInfoError::Usage(format!("Script {} is not valid UTF-8 text", path.display()))
    })
}
