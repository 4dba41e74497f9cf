use anyhow::anyhow;
use async_trait::async_trait;
use log::{debug, info};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{InstallError, Result};
use crate::http::HttpClient;
use crate::release::ReleaseTarget;
use crate::runtime::Runtime;

/// Default bound on a whole archive download
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Where release archives come from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Stream the resource at `url` into `writer`, returning the byte count.
    async fn download(&self, url: &str, writer: Box<dyn Write + Send>) -> anyhow::Result<u64>;
}

#[async_trait]
impl ArtifactSource for HttpClient {
    async fn download(&self, url: &str, writer: Box<dyn Write + Send>) -> anyhow::Result<u64> {
        self.download_file(url, move || Ok(writer)).await
    }
}

/// Downloads the target archive into `work_dir`, returning its path.
///
/// A partially written archive is removed before the error is returned.
#[tracing::instrument(skip(runtime, source, target), fields(url = %target.url))]
pub async fn fetch<R: Runtime, S: ArtifactSource>(
    runtime: &R,
    source: &S,
    target: &ReleaseTarget,
    work_dir: &Path,
    timeout: Duration,
) -> Result<PathBuf> {
    let download_error = |cause: anyhow::Error| InstallError::Download {
        url: target.url.clone(),
        cause,
    };

    info!("Downloading {}...", target.url);

    runtime.create_dir_all(work_dir).map_err(download_error)?;
    let archive_path = work_dir.join(&target.asset_name);
    let writer = runtime.create_file(&archive_path).map_err(download_error)?;

    let result = match tokio::time::timeout(timeout, source.download(&target.url, writer)).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!("timed out after {:?}", timeout)),
    };

    match result {
        Ok(bytes) => {
            debug!("Saved {} bytes to {:?}", bytes, archive_path);
            info!("Download complete.");
            Ok(archive_path)
        }
        Err(cause) => {
            if runtime.exists(&archive_path) {
                let _ = runtime.remove_file(&archive_path);
            }
            Err(download_error(cause))
        }
    }
}
