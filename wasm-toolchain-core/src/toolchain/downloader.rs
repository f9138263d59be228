//! Async file downloader with progress reporting and URL validation.
//!
//! Streams a release artifact to disk with reqwest, reports progress through
//! a callback, and rejects transfers that produce an empty file.

use anyhow::{Context, Result};
use futures::StreamExt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::{InstallError, InstallResult};

// ============================================================================
// URL Validation
// ============================================================================

/// Domains release artifacts may come from when no explicit base is configured.
const ALLOWED_DOMAINS: &[&str] = &["github.com", "githubusercontent.com"];

/// Validates that a URL is safe for downloading.
///
/// URLs below `trusted_base` are accepted as-is. Anything else must be HTTPS
/// on an allowed domain (subdomains included).
fn validate_url(url_str: &str, trusted_base: Option<&str>) -> Result<()> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL: {}", url_str))?;

    if let Some(base) = trusted_base {
        let base = base.trim_end_matches('/');
        if !base.is_empty() && url_str.starts_with(&format!("{}/", base)) {
            return Ok(());
        }
    }

    if url.scheme() != "https" {
        anyhow::bail!("URL must use HTTPS: {}", url_str);
    }

    let host = url
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("URL must have a host: {}", url_str))?;

    let is_allowed = ALLOWED_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)));

    if !is_allowed {
        anyhow::bail!(
            "Download domain not allowed: {}. Allowed: {:?}",
            host,
            ALLOWED_DOMAINS
        );
    }

    Ok(())
}

// ============================================================================
// Download Progress
// ============================================================================

/// Progress information during a download.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    /// Bytes downloaded so far.
    pub bytes_downloaded: u64,
    /// Total bytes expected (if known from Content-Length header).
    pub total_bytes: Option<u64>,
    /// Progress percentage (0.0 to 100.0), or None if total is unknown.
    pub percent: Option<f32>,
}

impl DownloadProgress {
    fn new(bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        let percent = total_bytes.map(|total| {
            if total > 0 {
                (bytes_downloaded as f32 / total as f32) * 100.0
            } else {
                0.0
            }
        });

        Self {
            bytes_downloaded,
            total_bytes,
            percent,
        }
    }
}

// ============================================================================
// Download Function
// ============================================================================

/// Downloads `url` to `dest`, returning the number of bytes written.
///
/// # Errors
///
/// Returns [`InstallError::Download`] if:
/// - The URL fails validation.
/// - The network request fails or the server returns a non-success status.
/// - The file cannot be created or written.
/// - The transfer succeeded but produced zero bytes.
pub async fn download_file<F>(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    trusted_base: Option<&str>,
    progress_cb: F,
) -> InstallResult<u64>
where
    F: Fn(DownloadProgress),
{
    let bytes = stream_to_file(client, url, dest, trusted_base, progress_cb)
        .await
        .map_err(|e| InstallError::Download {
            url: url.to_string(),
            reason: format!("{e:#}"),
        })?;

    // Trust the file on disk, not the transfer's own accounting
    let on_disk = tokio::fs::metadata(dest).await.map(|m| m.len()).unwrap_or(0);
    if bytes == 0 || on_disk == 0 {
        return Err(InstallError::Download {
            url: url.to_string(),
            reason: "downloaded file is empty (0 bytes)".to_string(),
        });
    }

    Ok(on_disk)
}

async fn stream_to_file<F>(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    trusted_base: Option<&str>,
    progress_cb: F,
) -> Result<u64>
where
    F: Fn(DownloadProgress),
{
    info!("Downloading {} to {}", url, dest.display());

    validate_url(url, trusted_base)?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to start download from {}", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!(
            "Download failed with status {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown error")
        );
    }

    let total_bytes = response.content_length();
    debug!("Content-Length: {:?}", total_bytes);

    let mut file = File::create(dest)
        .await
        .with_context(|| format!("Failed to create file: {}", dest.display()))?;

    let mut stream = response.bytes_stream();
    let mut bytes_downloaded: u64 = 0;

    progress_cb(DownloadProgress::new(0, total_bytes));

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.with_context(|| "Failed to read chunk from response stream")?;

        file.write_all(&chunk)
            .await
            .with_context(|| "Failed to write chunk to file")?;

        bytes_downloaded += chunk.len() as u64;
        progress_cb(DownloadProgress::new(bytes_downloaded, total_bytes));
    }

    file.flush().await.context("Failed to flush file")?;

    info!(
        "Download complete: {} bytes written to {}",
        bytes_downloaded,
        dest.display()
    );

    Ok(bytes_downloaded)
}
