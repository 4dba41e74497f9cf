//! SHA-256 verification of downloaded archives.

use anyhow::Context;
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::error::{InstallError, Result};
use crate::runtime::Runtime;

const SHA256_HEX_LEN: usize = 64;

/// Lowercase a digest, rejecting anything that is not 64 hex characters.
///
/// The release table ships `REPLACE_WITH_ACTUAL_SHA256_*` markers; those land
/// here as configuration errors rather than as digests that can never match.
pub fn normalize_digest(digest: &str) -> Result<String> {
    let digest = digest.trim();
    if digest.len() != SHA256_HEX_LEN || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(InstallError::configuration(format!(
            "'{}' is not a SHA-256 digest; supply the published value with --sha256 or --checksums",
            digest
        )));
    }
    Ok(digest.to_ascii_lowercase())
}

pub fn is_valid_digest(digest: &str) -> bool {
    normalize_digest(digest).is_ok()
}

/// Hash a file through the runtime, returning the lowercase hex digest.
#[tracing::instrument(skip(runtime))]
pub fn compute_sha256<R: Runtime>(runtime: &R, path: &Path) -> anyhow::Result<String> {
    let mut reader = runtime.open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = reader
            .read(&mut buf)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare the archive digest with `expected`, case-insensitively.
#[tracing::instrument(skip(runtime))]
pub fn verify<R: Runtime>(runtime: &R, archive_path: &Path, expected: &str) -> Result<()> {
    let expected = normalize_digest(expected)?;
    let actual = compute_sha256(runtime, archive_path)
        .map_err(|e| InstallError::io(e, archive_path, "checksum verification"))?;

    if actual != expected {
        return Err(InstallError::ChecksumMismatch { expected, actual });
    }

    info!("Checksum verified: {}", actual);
    Ok(())
}

/// Parse a `sha256sum`-style listing into `file name -> digest`.
///
/// Accepts `<hex>  <name>` and `<hex> *<name>` lines; blank lines and `#`
/// comments are skipped.
pub fn parse_checksums(content: &str) -> Result<HashMap<String, String>> {
    let mut checksums = HashMap::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (digest, name) = line
            .split_once(char::is_whitespace)
            .map(|(digest, rest)| (digest, rest.trim_start().trim_start_matches('*')))
            .filter(|(_, name)| !name.is_empty())
            .ok_or_else(|| {
                InstallError::configuration(format!(
                    "checksum file line {}: expected '<sha256>  <file>'",
                    index + 1
                ))
            })?;

        let digest = normalize_digest(digest).map_err(|_| {
            InstallError::configuration(format!(
                "checksum file line {}: '{}' is not a SHA-256 digest",
                index + 1,
                digest
            ))
        })?;

        // Listings sometimes carry a leading directory
        let name = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());

        checksums.insert(name, digest);
    }

    debug!("Parsed {} checksum entries", checksums.len());
    Ok(checksums)
}

/// Read and parse a checksum file.
#[tracing::instrument(skip(runtime))]
pub fn load_checksums<R: Runtime>(runtime: &R, path: &Path) -> Result<HashMap<String, String>> {
    let content = runtime.read_to_string(path).map_err(|e| {
        InstallError::configuration(format!(
            "cannot read checksum file {}: {:#}",
            path.display(),
            e
        ))
    })?;
    parse_checksums(&content)
}
