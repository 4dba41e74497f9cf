use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::checksum;
use crate::download::DEFAULT_DOWNLOAD_TIMEOUT;
use crate::error::{InstallError, Result};
use crate::platform::PlatformDescriptor;
use crate::release::{BINARY_NAME, DEFAULT_VERSION, ReleaseTable, ReleaseTarget};
use crate::runtime::Runtime;
use crate::smoke::DEFAULT_SMOKE_TEST_TIMEOUT;

/// Settings for one installer run.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    pub version: String,
    pub platform: PlatformDescriptor,
    pub bin_dir: PathBuf,
    pub table: ReleaseTable,
    /// Digest for the resolved target; wins over the table
    pub sha256: Option<String>,
    pub download_timeout: Duration,
    /// `None` skips the smoke test
    pub smoke_test_timeout: Option<Duration>,
}

impl InstallerConfig {
    pub fn new(platform: PlatformDescriptor, bin_dir: PathBuf) -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            platform,
            bin_dir,
            table: ReleaseTable::default(),
            sha256: None,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            smoke_test_timeout: Some(DEFAULT_SMOKE_TEST_TIMEOUT),
        }
    }

    /// Final location of the installed executable
    pub fn dest_path(&self) -> PathBuf {
        self.bin_dir.join(BINARY_NAME)
    }

    /// Resolve the release target, applying the `sha256` override.
    pub fn resolve_target(&self) -> Result<ReleaseTarget> {
        resolve_target(&self.table, &self.platform, &self.version, self.sha256.as_deref())
    }
}

/// Resolve `version` for `platform`; a given `sha256` replaces the table digest.
pub fn resolve_target(
    table: &ReleaseTable,
    platform: &PlatformDescriptor,
    version: &str,
    sha256: Option<&str>,
) -> Result<ReleaseTarget> {
    let mut target = table.resolve(platform, version)?;
    if let Some(sha256) = sha256 {
        target.expected_checksum = checksum::normalize_digest(sha256)?;
    }
    Ok(target)
}

/// The directory `scorex` is installed into.
///
/// An explicit directory wins; otherwise the platform's user executable
/// directory (`~/.local/bin` on Linux), falling back to `~/.local/bin`.
#[tracing::instrument(skip(runtime))]
pub fn resolve_bin_dir<R: Runtime>(runtime: &R, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        // An empty path would make `<dir>/scorex` a bare command name
        if dir.as_os_str().is_empty() {
            return Err(InstallError::configuration("install directory must not be empty"));
        }
        return Ok(dir.to_path_buf());
    }

    let dir = runtime
        .executable_dir()
        .or_else(|| runtime.home_dir().map(|home| home.join(".local").join("bin")))
        .ok_or_else(|| {
            InstallError::configuration(
                "could not determine an install directory; pass --bin-dir or set SCOREX_BIN_DIR",
            )
        })?;

    debug!("Using default bin dir {:?}", dir);
    Ok(dir)
}
