use flate2::read::GzDecoder;
use log::{debug, info};
use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tar::{Archive, EntryType};

use super::ArchiveExtractor;
use crate::error::{InstallError, Result};
use crate::runtime::Runtime;

/// Extractor for .tar.gz / .tgz archives
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }

    #[tracing::instrument(skip(self, runtime))]
    fn extract_binary<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        entry_name: &str,
        dest: &Path,
    ) -> Result<()> {
        debug!("Extracting {} from {:?}...", entry_name, archive_path);
        let malformed = |e: io::Error| {
            InstallError::extraction(archive_path, format!("malformed tar.gz archive: {}", e))
        };

        let file = runtime
            .open(archive_path)
            .map_err(|e| InstallError::io(e, archive_path, "opening archive"))?;
        let mut archive = Archive::new(GzDecoder::new(file));

        let mut files: Vec<PathBuf> = Vec::new();
        let mut extracted = false;

        for entry in archive.entries().map_err(malformed)? {
            let mut entry = entry.map_err(malformed)?;
            let path = entry.path().map_err(malformed)?.into_owned();

            match entry.header().entry_type() {
                EntryType::Directory | EntryType::XGlobalHeader => continue,
                EntryType::Regular => {}
                other => {
                    return Err(InstallError::extraction(
                        archive_path,
                        format!("unexpected {:?} entry {}", other, path.display()),
                    ));
                }
            }

            files.push(path.clone());
            if files.len() > 1 {
                return Err(InstallError::extraction(
                    archive_path,
                    format!(
                        "expected a single file, found {}",
                        files
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                ));
            }

            if path.file_name() != Some(OsStr::new(entry_name)) {
                continue;
            }

            let mut out = runtime
                .create_file(dest)
                .map_err(|e| InstallError::io(e, dest, "writing binary"))?;
            io::copy(&mut entry, &mut out).map_err(|e| match e.kind() {
                io::ErrorKind::PermissionDenied => InstallError::Permission {
                    path: dest.to_path_buf(),
                    source: Some(e),
                },
                _ => malformed(e),
            })?;
            out.flush()
                .map_err(|e| InstallError::io(e.into(), dest, "writing binary"))?;
            extracted = true;
        }

        match (files.first(), extracted) {
            (None, _) => Err(InstallError::extraction(archive_path, "archive contains no files")),
            (Some(found), false) => Err(InstallError::extraction(
                archive_path,
                format!("expected entry '{}', found '{}'", entry_name, found.display()),
            )),
            (Some(_), true) => {
                info!("Extraction complete.");
                Ok(())
            }
        }
    }
}
