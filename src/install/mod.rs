//! Placing the extracted binary at its final path.
//!
//! The binary is written to a temporary file next to the destination, made
//! executable and renamed into place, so `dest` only ever holds a complete
//! binary: either the previous one or the new one.

mod installer;

use log::{debug, info};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::archive::ArchiveExtractor;
use crate::cleanup::{CleanupGuard, SharedCleanupContext};
use crate::error::{InstallError, Result};
use crate::runtime::Runtime;

pub use installer::{InstallReport, Installer, RunOutcome, RunState};

/// Mode of the installed executable
pub const EXECUTABLE_MODE: u32 = 0o755;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledArtifact {
    /// Archive entry the binary was extracted from
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
}

static STAGING_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Temporary sibling of `dest` used for the atomic rename.
///
/// Every call returns a fresh name, so overlapping installs to the same
/// `dest` never share a staging file.
pub fn staging_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(
        ".{}.{}.{}.tmp",
        name,
        std::process::id(),
        STAGING_COUNTER.fetch_add(1, Ordering::Relaxed)
    ))
}

/// Create `dir` if needed and make sure files can be created in it.
#[tracing::instrument(skip(runtime))]
pub fn ensure_writable_dir<R: Runtime>(runtime: &R, dir: &Path) -> Result<()> {
    if !runtime.exists(dir) {
        debug!("Creating {:?}", dir);
        runtime
            .create_dir_all(dir)
            .map_err(|e| InstallError::io(e, dir, "creating install directory"))?;
    }

    if !runtime.is_writable_dir(dir) {
        return Err(InstallError::Permission {
            path: dir.to_path_buf(),
            source: None,
        });
    }
    Ok(())
}

/// Extract `entry_name` from the archive and install it at `dest`.
///
/// Overwrites an existing `dest`. On failure `dest` is untouched and the
/// staging file is removed.
#[tracing::instrument(skip(runtime, extractor, cleanup_ctx))]
pub fn install<R: Runtime + 'static, E: ArchiveExtractor>(
    runtime: &R,
    extractor: &E,
    archive_path: &Path,
    entry_name: &str,
    dest: &Path,
    cleanup_ctx: SharedCleanupContext,
) -> Result<InstalledArtifact> {
    if !extractor.can_handle(archive_path) {
        return Err(InstallError::extraction(archive_path, "unsupported archive format"));
    }

    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| {
            InstallError::configuration(format!("{} has no parent directory", dest.display()))
        })?;
    ensure_writable_dir(runtime, dir)?;

    let staging = staging_path(dest);
    let guard = CleanupGuard::new(cleanup_ctx, staging.clone());

    let placed = extractor
        .extract_binary(runtime, archive_path, entry_name, &staging)
        .and_then(|()| {
            runtime
                .set_permissions(&staging, EXECUTABLE_MODE)
                .map_err(|e| InstallError::io(e, &staging, "setting executable permission"))
        })
        .and_then(|()| {
            runtime
                .rename(&staging, dest)
                .map_err(|e| InstallError::io(e, dest, "moving binary into place"))
        });

    if placed.is_err() && runtime.exists(&staging) {
        let _ = runtime.remove_file(&staging);
    }
    // The staging file is gone either way
    guard.success();
    placed?;

    info!("Installed {:?}", dest);
    Ok(InstalledArtifact {
        source_path: PathBuf::from(entry_name),
        dest_path: dest.to_path_buf(),
    })
}
