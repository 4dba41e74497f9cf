pub mod archive;
pub mod checksum;
pub mod cleanup;
pub mod config;
pub mod download;
pub mod error;
pub mod formula;
pub mod http;
pub mod install;
pub mod platform;
pub mod release;
pub mod runtime;
pub mod smoke;

pub use config::InstallerConfig;
pub use error::{InstallError, Result};
pub use install::{InstallReport, Installer, RunOutcome, RunState};
pub use platform::{Arch, OsFamily, PlatformDescriptor};
pub use release::{ReleaseTable, ReleaseTarget};
