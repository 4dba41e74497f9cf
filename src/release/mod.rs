//! Release table and URL resolution.
//!
//! The published scorex releases form a small static table keyed by
//! `(OsFamily, Arch)`. Resolution picks the one entry for the platform and
//! expands the download URL for the requested version.

use log::debug;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{InstallError, Result};
use crate::platform::{Arch, OsFamily, PlatformDescriptor};

/// Name of the installed executable
pub const BINARY_NAME: &str = "scorex";

/// Where release assets are published
pub const DEFAULT_BASE_URL: &str =
    "https://github.com/eclipse-score/score_scrample/releases/download";

/// Version installed when none is requested
pub const DEFAULT_VERSION: &str = "0.1.0";

/// One supported platform and the digest shipped for it.
#[derive(Debug)]
pub struct ReleaseEntry {
    pub os: OsFamily,
    pub arch: Arch,
    pub sha256: &'static str,
}

/// Linux on arm64 has no published artifact.
pub static RELEASE_TABLE: &[ReleaseEntry] = &[
    ReleaseEntry {
        os: OsFamily::MacOs,
        arch: Arch::Arm64,
        sha256: "REPLACE_WITH_ACTUAL_SHA256_ARM64",
    },
    ReleaseEntry {
        os: OsFamily::MacOs,
        arch: Arch::X86_64,
        sha256: "REPLACE_WITH_ACTUAL_SHA256_X86_64",
    },
    ReleaseEntry {
        os: OsFamily::Linux,
        arch: Arch::X86_64,
        sha256: "REPLACE_WITH_ACTUAL_SHA256_LINUX",
    },
];

/// The concrete artifact selected for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseTarget {
    pub version: String,
    pub platform: PlatformDescriptor,
    /// Archive file name, e.g. `scorex-0.1.0-macos-arm64.tar.gz`
    pub asset_name: String,
    /// Name of the binary inside the archive, e.g. `scorex-macos-arm64`
    pub archive_entry: String,
    pub url: String,
    pub expected_checksum: String,
}

/// Release archive name for a version and platform.
pub fn asset_name(version: &str, platform: &PlatformDescriptor) -> String {
    format!(
        "{}-{}-{}-{}.tar.gz",
        BINARY_NAME, version, platform.os, platform.arch
    )
}

/// Binary name inside the release archive.
pub fn archive_entry_name(platform: &PlatformDescriptor) -> String {
    format!("{}-{}-{}", BINARY_NAME, platform.os, platform.arch)
}

/// Strip an optional `v` prefix and reject values that cannot be part of a URL path.
pub fn normalize_version(version: &str) -> Result<String> {
    let trimmed = version.trim();
    let version = trimmed.strip_prefix('v').unwrap_or(trimmed);

    if version.is_empty() {
        return Err(InstallError::configuration("version must not be empty"));
    }
    if version
        .chars()
        .any(|c| c.is_whitespace() || c == '/' || c == '\\' || c == '?' || c == '#')
    {
        return Err(InstallError::configuration(format!("invalid version '{}'", trimmed)));
    }
    Ok(version.to_string())
}

/// Static release table plus run-time overrides (base URL, digests).
#[derive(Debug, Clone)]
pub struct ReleaseTable {
    base_url: String,
    /// asset name -> sha256
    checksums: HashMap<String, String>,
}

impl Default for ReleaseTable {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ReleaseTable {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            checksums: HashMap::new(),
        }
    }

    /// Override shipped digests, keyed by asset name.
    pub fn with_checksums(mut self, checksums: HashMap<String, String>) -> Self {
        self.checksums.extend(checksums);
        self
    }

    /// Platforms that have a published artifact, in table order
    pub fn supported_platforms(&self) -> impl Iterator<Item = PlatformDescriptor> + '_ {
        RELEASE_TABLE
            .iter()
            .map(|entry| PlatformDescriptor::new(entry.os.clone(), entry.arch.clone()))
    }

    #[tracing::instrument(skip(self))]
    pub fn resolve(&self, platform: &PlatformDescriptor, version: &str) -> Result<ReleaseTarget> {
        let entry = RELEASE_TABLE
            .iter()
            .find(|entry| entry.os == platform.os && entry.arch == platform.arch)
            .ok_or_else(|| InstallError::UnsupportedPlatform {
                platform: platform.clone(),
            })?;

        let version = normalize_version(version)?;
        let asset_name = asset_name(&version, platform);
        let url = format!("{}/v{}/{}", self.base_url, version, asset_name);
        let expected_checksum = self
            .checksums
            .get(&asset_name)
            .cloned()
            .unwrap_or_else(|| entry.sha256.to_string());

        debug!("Resolved {} to {}", platform, url);

        Ok(ReleaseTarget {
            version,
            platform: platform.clone(),
            archive_entry: archive_entry_name(platform),
            asset_name,
            url,
            expected_checksum,
        })
    }
}

/// Resolve against the default table.
pub fn resolve(platform: &PlatformDescriptor, version: &str) -> Result<ReleaseTarget> {
    ReleaseTable::default().resolve(platform, version)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(os: OsFamily, arch: Arch) -> PlatformDescriptor {
        PlatformDescriptor::new(os, arch)
    }

    #[test]
    fn test_resolve_macos_arm64_url() {
        let target = resolve(&platform(OsFamily::MacOs, Arch::Arm64), "0.1.0").unwrap();
        assert_eq!(
            target.url,
            "https://github.com/eclipse-score/score_scrample/releases/download/v0.1.0/scorex-0.1.0-macos-arm64.tar.gz"
        );
        assert_eq!(target.asset_name, "scorex-0.1.0-macos-arm64.tar.gz");
        assert_eq!(target.archive_entry, "scorex-macos-arm64");
    }

    #[test]
    fn test_resolve_all_supported_platforms() {
        let table = ReleaseTable::default();
        let platforms: Vec<_> = table.supported_platforms().collect();
        assert_eq!(platforms.len(), 3);

        for p in platforms {
            let target = table.resolve(&p, "2.3.4").unwrap();
            assert!(target.url.contains("/v2.3.4/"));
            assert!(target.url.ends_with(&format!(
                "scorex-2.3.4-{}-{}.tar.gz",
                p.os.as_str(),
                p.arch.as_str()
            )));
            assert_eq!(target.platform, p);
        }
    }

    #[test]
    fn test_resolve_linux_arm64_is_unsupported() {
        let err = resolve(&platform(OsFamily::Linux, Arch::Arm64), "0.1.0").unwrap_err();
        match err {
            InstallError::UnsupportedPlatform { platform } => {
                assert_eq!(platform.to_string(), "linux/arm64");
            }
            other => panic!("expected UnsupportedPlatform, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_unknown_platforms_are_unsupported() {
        let cases = [
            platform(OsFamily::Other("windows".into()), Arch::X86_64),
            platform(OsFamily::MacOs, Arch::Other("riscv64".into())),
            platform(OsFamily::Linux, Arch::Other("x86".into())),
        ];
        for p in cases {
            assert!(matches!(
                resolve(&p, "0.1.0"),
                Err(InstallError::UnsupportedPlatform { .. })
            ));
        }
    }

    #[test]
    fn test_resolve_strips_v_prefix() {
        let p = platform(OsFamily::Linux, Arch::X86_64);
        assert_eq!(resolve(&p, "v0.1.0").unwrap(), resolve(&p, "0.1.0").unwrap());
    }

    #[test]
    fn test_resolve_rejects_bad_versions() {
        let p = platform(OsFamily::Linux, Arch::X86_64);
        for version in ["", "v", "1.0 beta", "../1.0"] {
            assert!(
                matches!(
                    resolve(&p, version),
                    Err(InstallError::Configuration { .. })
                ),
                "version {version:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_resolve_uses_shipped_placeholder_by_default() {
        let target = resolve(&platform(OsFamily::MacOs, Arch::X86_64), "0.1.0").unwrap();
        assert_eq!(target.expected_checksum, "REPLACE_WITH_ACTUAL_SHA256_X86_64");
    }

    #[test]
    fn test_checksum_override_by_asset_name() {
        let digest = "a".repeat(64);
        let table = ReleaseTable::default().with_checksums(HashMap::from([(
            "scorex-0.1.0-linux-x86_64.tar.gz".to_string(),
            digest.clone(),
        )]));

        let linux = table
            .resolve(&platform(OsFamily::Linux, Arch::X86_64), "0.1.0")
            .unwrap();
        assert_eq!(linux.expected_checksum, digest);

        // Other versions keep the shipped value
        let other = table
            .resolve(&platform(OsFamily::Linux, Arch::X86_64), "0.2.0")
            .unwrap();
        assert_eq!(other.expected_checksum, "REPLACE_WITH_ACTUAL_SHA256_LINUX");
    }

    #[test]
    fn test_custom_base_url_trailing_slash() {
        let table = ReleaseTable::new("http://127.0.0.1:8080/dl/");
        let target = table
            .resolve(&platform(OsFamily::Linux, Arch::X86_64), "0.1.0")
            .unwrap();
        assert_eq!(
            target.url,
            "http://127.0.0.1:8080/dl/v0.1.0/scorex-0.1.0-linux-x86_64.tar.gz"
        );
    }
}
