//! Error taxonomy for an installer run.
//!
//! Every step of the pipeline maps its failure into one [`InstallError`]
//! variant. None of them are retried; the variant decides the process exit
//! code.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::platform::PlatformDescriptor;

/// Main error type for installer operations
#[derive(Error, Debug)]
pub enum InstallError {
    /// No release artifact is published for the platform
    #[error("resolve: no scorex release for {platform} (supported: macos/arm64, macos/x86_64, linux/x86_64)")]
    UnsupportedPlatform {
        /// The (os, arch) combination that has no table entry
        platform: PlatformDescriptor,
    },

    /// Fetching the archive failed
    #[error("download: failed to fetch {url}: {cause:#}")]
    Download {
        url: String,
        #[source]
        cause: anyhow::Error,
    },

    /// The archive digest does not match the expected one
    #[error("verify: checksum mismatch (expected {expected}, got {actual})")]
    ChecksumMismatch { expected: String, actual: String },

    /// The archive is malformed or does not hold exactly the expected binary
    #[error("install: cannot extract {archive}: {message}")]
    Extraction { archive: PathBuf, message: String },

    /// The destination directory cannot be written
    #[error("install: permission denied writing to {}", path.display())]
    Permission {
        path: PathBuf,
        #[source]
        source: Option<io::Error>,
    },

    /// The installed binary did not pass `scorex version`
    #[error("smoke test: `{} version` {outcome}", binary.display())]
    SmokeTestFailure { binary: PathBuf, outcome: String },

    /// Invalid settings (placeholder digest, malformed version, bad checksum file)
    #[error("configuration: {message}")]
    Configuration { message: String },

    /// I/O failure that belongs to none of the steps above
    #[error("I/O error during {operation}: {source:#}")]
    Io {
        operation: String,
        #[source]
        source: anyhow::Error,
    },
}

impl InstallError {
    /// Create a configuration error with a message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an extraction error for an archive
    pub fn extraction(archive: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction {
            archive: archive.into(),
            message: message.into(),
        }
    }

    /// Wrap a runtime failure, promoting `PermissionDenied` to [`InstallError::Permission`]
    pub fn io(
        source: anyhow::Error,
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
    ) -> Self {
        match permission_denied(&source) {
            Some(kind) => Self::Permission {
                path: path.into(),
                source: Some(io::Error::from(kind)),
            },
            None => Self::Io {
                operation: operation.into(),
                source,
            },
        }
    }

    /// Process exit code for this failure kind
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::UnsupportedPlatform { .. } => 2,
            Self::Download { .. } => 3,
            Self::ChecksumMismatch { .. } => 4,
            Self::Extraction { .. } => 5,
            Self::Permission { .. } => 6,
            Self::SmokeTestFailure { .. } => 7,
            Self::Configuration { .. } => 8,
            Self::Io { .. } => 1,
        }
    }
}

fn permission_denied(error: &anyhow::Error) -> Option<io::ErrorKind> {
    error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .map(io::Error::kind)
        .find(|kind| *kind == io::ErrorKind::PermissionDenied)
}

/// Result type for installer operations
pub type Result<T> = std::result::Result<T, InstallError>;
