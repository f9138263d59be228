//! Install pipeline for a single tool.
//!
//! resolve version -> name artifact -> cache lookup -> download -> extract
//! -> locate binary -> store in cache -> remap onto the cached tree.
//!
//! A cache hit short-circuits after the lookup and only re-runs the locator
//! against the cached tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::archive::{archive_descriptor, DEFAULT_DOWNLOAD_BASE};
use super::cache::ToolCache;
use super::catalog::{get_driver, ToolDriver};
use super::downloader::{download_file, DownloadProgress};
use super::extractor::{extract_artifact, extract_with_system_tar};
use super::locator::{locate_binary, BinaryLocation};
use super::manifest::CacheKey;
use super::paths::RunDirs;
use super::release::{ensure_proper_version, ReleaseClient};
use super::types::{ArchiveDescriptor, Dependency, Platform, ResolvedDependency};
use crate::error::{InstallError, InstallResult};

// ============================================================================
// Install Outcome
// ============================================================================

/// Result of installing one tool.
#[derive(Debug, Clone)]
pub struct InstalledTool {
    pub resolved: ResolvedDependency,
    /// Absolute directory expected to contain the executable.
    pub bin_dir: PathBuf,
    /// Executable filename for the host platform.
    pub executable: String,
    /// False when the locator fell back to the tree root.
    pub binary_found: bool,
    /// True when the download was skipped because of a cache hit.
    pub from_cache: bool,
}

impl InstalledTool {
    pub fn executable_path(&self) -> PathBuf {
        self.bin_dir.join(&self.executable)
    }
}

// ============================================================================
// Tool Installer
// ============================================================================

/// Runs the install pipeline. Shared by both tools of a run.
pub struct ToolInstaller {
    client: reqwest::Client,
    releases: ReleaseClient,
    cache: Arc<dyn ToolCache>,
    run_dirs: RunDirs,
    platform: Option<Platform>,
    download_base: String,
}

impl ToolInstaller {
    /// Creates an installer for the detected host platform.
    pub fn new(
        client: reqwest::Client,
        releases: ReleaseClient,
        cache: Arc<dyn ToolCache>,
        run_dirs: RunDirs,
        download_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            releases,
            cache,
            run_dirs,
            platform: Platform::detect(),
            download_base: download_base.into(),
        }
    }

    /// Overrides the host platform. `None` behaves like an unknown host.
    pub fn with_platform(mut self, platform: Option<Platform>) -> Self {
        self.platform = platform;
        self
    }

    /// Installs `dependency` and returns where its executable lives.
    ///
    /// # Errors
    ///
    /// Fails on an unsupported platform, a failed or empty download, an
    /// extraction every strategy rejects, or a cache error. A latest-release
    /// lookup failure is not an error; the pinned tag is used instead.
    pub async fn install(&self, dependency: &Dependency) -> InstallResult<InstalledTool> {
        let driver = get_driver(dependency.tool);
        let resolved = ensure_proper_version(&self.releases, dependency).await;

        let platform = self
            .platform
            .ok_or_else(|| InstallError::unsupported(dependency.tool, None))?;
        let descriptor =
            archive_descriptor(driver, &resolved.version, platform, &self.download_base)
                .ok_or_else(|| InstallError::unsupported(dependency.tool, Some(platform)))?;

        let executable = driver.executable_name(platform);
        let known_dirs = (driver.search_dirs)(&resolved.version);
        let key = CacheKey::new(dependency.tool, &resolved.version, platform.arch.as_str());

        info!(
            "Installing {} {} for {} from {}",
            driver.display_name, resolved.version, platform, descriptor.url
        );

        if let Some(cached_root) = self.cache.lookup(&key).await? {
            let location = locate(&cached_root, &executable, &known_dirs).await?;
            return Ok(InstalledTool {
                resolved,
                bin_dir: location.dir,
                executable,
                binary_found: location.found,
                from_cache: true,
            });
        }

        let extracted = self
            .fetch_and_extract(driver, &descriptor, platform, &executable)
            .await?;
        let location = locate(&extracted, &executable, &known_dirs).await?;

        let cached_root = self.cache.store(&extracted, &key).await?;
        let bin_dir = remap_onto(&location, &extracted, &cached_root);
        debug!(
            "Remapped {} onto cached tree as {}",
            location.dir.display(),
            bin_dir.display()
        );

        info!(
            "{} {} ready in {}",
            driver.display_name,
            resolved.version,
            bin_dir.display()
        );

        Ok(InstalledTool {
            resolved,
            bin_dir,
            executable,
            binary_found: location.found,
            from_cache: false,
        })
    }

    async fn fetch_and_extract(
        &self,
        driver: &ToolDriver,
        descriptor: &ArchiveDescriptor,
        platform: Platform,
        executable: &str,
    ) -> InstallResult<PathBuf> {
        let archive = self.download(driver, descriptor).await?;
        let dest = self.run_dirs.extract_dir(driver.tool.as_str());

        let archive_for_extract = archive.clone();
        let declared = descriptor.kind;
        let executable_name = executable.to_string();
        let extracted = tokio::task::spawn_blocking(move || {
            extract_artifact(&archive_for_extract, declared, &dest, &executable_name)
        })
        .await
        .map_err(|e| extraction_task_failed(&archive, e))?;

        match extracted {
            Ok(dir) => Ok(dir),
            Err(err) if driver.system_tar_fallback && !platform.is_windows() => {
                warn!(
                    "{} extraction failed ({}), retrying with system tar after a fresh download",
                    driver.display_name, err
                );
                let retry = self.download(driver, descriptor).await?;
                let retry_dest = self.run_dirs.extract_dir(driver.tool.as_str());
                extract_with_system_tar(&retry, &retry_dest).await
            }
            Err(err) => Err(err),
        }
    }

    async fn download(
        &self,
        driver: &ToolDriver,
        descriptor: &ArchiveDescriptor,
    ) -> InstallResult<PathBuf> {
        let dest = self.run_dirs.download_path(&descriptor.file_name);
        let trusted_base = self.trusted_base();
        let name = driver.display_name;
        let last_decile = AtomicU64::new(0);

        download_file(
            &self.client,
            &descriptor.url,
            &dest,
            trusted_base,
            |progress: DownloadProgress| {
                if let Some(percent) = progress.percent {
                    let decile = (percent / 10.0) as u64;
                    if decile > last_decile.swap(decile, Ordering::Relaxed) {
                        debug!("{} download progress: {:.0}%", name, percent);
                    }
                }
            },
        )
        .await?;

        Ok(dest)
    }

    /// A non-default download base is trusted as configured.
    fn trusted_base(&self) -> Option<&str> {
        let base = self.download_base.trim_end_matches('/');
        (base != DEFAULT_DOWNLOAD_BASE).then_some(base)
    }
}

/// Runs the locator off the async executor.
async fn locate(
    root: &Path,
    executable: &str,
    known_dirs: &[String],
) -> InstallResult<BinaryLocation> {
    let root = root.to_path_buf();
    let executable = executable.to_string();
    let known_dirs = known_dirs.to_vec();
    let location =
        tokio::task::spawn_blocking(move || locate_binary(&root, &executable, &known_dirs))
            .await
            .map_err(io::Error::from)?;
    Ok(location)
}

/// Extraction error for a blocking task that panicked or was cancelled.
fn extraction_task_failed(archive: &Path, err: tokio::task::JoinError) -> InstallError {
    let size = fs::metadata(archive).map(|m| m.len()).unwrap_or(0);
    InstallError::extraction(
        archive,
        size,
        &anyhow::anyhow!("extraction task failed: {err}"),
    )
}

/// Re-expresses a located directory inside `extracted_root` relative to `cached_root`.
fn remap_onto(location: &BinaryLocation, extracted_root: &Path, cached_root: &Path) -> PathBuf {
    match location.dir.strip_prefix(extracted_root) {
        Ok(offset) if offset.as_os_str().is_empty() => cached_root.to_path_buf(),
        Ok(offset) => cached_root.join(offset),
        Err(_) => cached_root.to_path_buf(),
    }
}
