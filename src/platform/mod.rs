//! Host platform description.
//!
//! A [`PlatformDescriptor`] is derived once per run, either from the host
//! (`std::env::consts`) or from explicit `--os`/`--arch` arguments, and then
//! passed down to release resolution.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Operating system family
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    #[serde(rename = "macos")]
    MacOs,
    Linux,
    Other(String),
}

/// CPU architecture
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Arm64,
    #[serde(rename = "x86_64")]
    X86_64,
    Other(String),
}

impl OsFamily {
    /// Token used in release asset names
    pub fn as_str(&self) -> &str {
        match self {
            OsFamily::MacOs => "macos",
            OsFamily::Linux => "linux",
            OsFamily::Other(name) => name,
        }
    }

    fn from_host(os: &str) -> Self {
        match os {
            "macos" => OsFamily::MacOs,
            "linux" => OsFamily::Linux,
            other => OsFamily::Other(other.to_string()),
        }
    }
}

impl Arch {
    /// Token used in release asset names
    pub fn as_str(&self) -> &str {
        match self {
            Arch::Arm64 => "arm64",
            Arch::X86_64 => "x86_64",
            Arch::Other(name) => name,
        }
    }

    fn from_host(arch: &str) -> Self {
        match arch {
            "aarch64" => Arch::Arm64,
            "x86_64" => Arch::X86_64,
            other => Arch::Other(other.to_string()),
        }
    }
}

impl FromStr for OsFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "macos" | "darwin" | "osx" => Ok(OsFamily::MacOs),
            "linux" => Ok(OsFamily::Linux),
            "" => Err("operating system must not be empty".to_string()),
            other => Ok(OsFamily::Other(other.to_string())),
        }
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            "x86_64" | "amd64" | "x64" => Ok(Arch::X86_64),
            "" => Err("architecture must not be empty".to_string()),
            other => Ok(Arch::Other(other.to_string())),
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform information for release resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PlatformDescriptor {
    pub os: OsFamily,
    pub arch: Arch,
}

impl PlatformDescriptor {
    pub fn new(os: OsFamily, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detect the current platform
    pub fn detect() -> Self {
        Self::from_consts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Build a descriptor from Rust target names (`std::env::consts` values)
    pub fn from_consts(os: &str, arch: &str) -> Self {
        Self {
            os: OsFamily::from_host(os),
            arch: Arch::from_host(arch),
        }
    }

    /// Detect the host platform, replacing either half with an explicit override
    pub fn detect_with_overrides(os: Option<OsFamily>, arch: Option<Arch>) -> Self {
        let host = Self::detect();
        Self {
            os: os.unwrap_or(host.os),
            arch: arch.unwrap_or(host.arch),
        }
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
