//! Streaming HTTP downloads.

use anyhow::{Context, Result, anyhow};
use log::debug;
use reqwest::{Client, StatusCode};
use std::io::Write;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("scorex-installer/", env!("SCOREX_INSTALLER_VERSION"));

/// Thin wrapper around a reqwest [`Client`] for release downloads.
///
/// Requests are made once; failures surface to the caller unchanged.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client with the installer's user agent and default settings.
    pub fn with_defaults() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(client))
    }

    /// Streams the body at `url` into the writer returned by `create_writer`.
    ///
    /// The writer is only created once the server answered with a success
    /// status, so nothing is written for 404s and the like.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: FnOnce() -> Result<W>,
    {
        debug!("Downloading file from {}...", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to start download request")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!(describe_status(status)));
        }

        let mut response = response;
        let mut writer = create_writer()?;
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read chunk from download stream")?
        {
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer.flush().context("Failed to flush downloaded file")?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }
}

/// Human-readable explanation of an unsuccessful HTTP status.
pub fn describe_status(status: StatusCode) -> String {
    match status {
        StatusCode::NOT_FOUND => {
            "HTTP 404: release asset not found (is the version published?)".to_string()
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("HTTP {}: access to the release asset was denied", status.as_u16())
        }
        StatusCode::TOO_MANY_REQUESTS => "HTTP 429: rate limited, try again later".to_string(),
        s if s.is_server_error() => format!("HTTP {}: server error", s.as_u16()),
        s => format!("HTTP {}", s.as_u16()),
    }
}
