mod tar_gz;

use crate::error::Result;
use crate::runtime::Runtime;
use std::path::Path;

pub use tar_gz::TarGzExtractor;

/// Trait for format-specific single-binary extractors
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor: Send + Sync {
    /// Check if this extractor can handle the given archive format
    fn can_handle(&self, archive_path: &Path) -> bool;

    /// Write the one executable entry named `entry_name` to `dest`.
    ///
    /// The archive must hold exactly one regular file and it must be
    /// `entry_name`; anything else is an extraction error. `dest` is left
    /// in an unspecified state on error and should be discarded.
    fn extract_binary<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        entry_name: &str,
        dest: &Path,
    ) -> Result<()>;
}
