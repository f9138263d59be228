//! Release artifact naming and download URLs.

use super::catalog::ToolDriver;
use super::types::{ArchiveDescriptor, ArchiveKind, Platform};

/// Default host serving release downloads.
pub const DEFAULT_DOWNLOAD_BASE: &str = "https://github.com";

/// Builds the download URL of a release asset. No network access.
///
/// `{base}/{owner}/{repo}/releases/download/{version}/{file_name}`
pub fn download_url(base: &str, repository: &str, version: &str, file_name: &str) -> String {
    format!(
        "{}/{}/releases/download/{}/{}",
        base.trim_end_matches('/'),
        repository,
        version,
        file_name
    )
}

/// Computes the archive to fetch for `driver` at `version` on `platform`.
///
/// Returns `None` when the tool has no artifact for the platform; callers
/// must treat that as fatal and not attempt a download.
pub fn archive_descriptor(
    driver: &ToolDriver,
    version: &str,
    platform: Platform,
    download_base: &str,
) -> Option<ArchiveDescriptor> {
    let file_name = (driver.archive_name)(version, platform)?;
    let url = download_url(download_base, &driver.repository(), version, &file_name);
    let kind = ArchiveKind::from_file_name(&file_name);

    Some(ArchiveDescriptor {
        file_name,
        url,
        kind,
    })
}
