//! Persistent tool cache.
//!
//! Extracted archives are stored by (tool, version, architecture) so later
//! runs on the same machine can skip the download. Entries are immutable once
//! written; a hit is trusted without re-validation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::manifest::{load_entry, write_entry, CacheKey, CachedEntry};
use crate::error::{InstallError, InstallResult};

/// Key/value store of extracted tool trees.
#[async_trait]
pub trait ToolCache: Send + Sync {
    /// Returns the cached root for `key`, if present.
    async fn lookup(&self, key: &CacheKey) -> InstallResult<Option<PathBuf>>;

    /// Stores a copy of `source` under `key` and returns the cached root.
    ///
    /// If an entry for `key` already exists it is returned unchanged.
    async fn store(&self, source: &Path, key: &CacheKey) -> InstallResult<PathBuf>;
}

/// Filesystem-backed [`ToolCache`].
///
/// Layout: `{cache_dir}/{tool}/{version}/{arch}/`, each entry holding its own
/// marker file. An entry counts as present only when its marker is readable
/// and names the same key. Stores never touch shared files, so concurrent
/// runs cannot lose each other's entries.
#[derive(Debug, Clone)]
pub struct FsToolCache {
    cache_dir: PathBuf,
}

impl FsToolCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Directory an entry lives in.
    pub fn entry_dir(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir
            .join(key.tool.as_str())
            .join(&key.version)
            .join(&key.arch)
    }
}

#[async_trait]
impl ToolCache for FsToolCache {
    async fn lookup(&self, key: &CacheKey) -> InstallResult<Option<PathBuf>> {
        let dir = self.entry_dir(key);
        let entry_key = key.clone();
        let entry_dir = dir.clone();
        let present =
            tokio::task::spawn_blocking(move || is_complete_entry(&entry_dir, &entry_key))
                .await
                .map_err(io::Error::from)?;

        if !present {
            debug!("Cache miss for {}", key);
            return Ok(None);
        }

        info!("Cache hit for {} at {}", key, dir.display());
        Ok(Some(dir))
    }

    async fn store(&self, source: &Path, key: &CacheKey) -> InstallResult<PathBuf> {
        let target = self.entry_dir(key);
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.cache_dir.clone());
        let staging = parent.join(format!(".staging-{}", uuid::Uuid::new_v4().simple()));

        let src = source.to_path_buf();
        let dst = target.clone();
        let entry_key = key.clone();
        let size_bytes =
            tokio::task::spawn_blocking(move || place_entry(&src, &staging, &dst, &entry_key))
                .await
                .map_err(io::Error::from)?
                .map_err(|e| InstallError::Cache(format!("{e:#}")))?;

        info!(
            "Cached {} ({} bytes) at {}",
            key,
            size_bytes,
            target.display()
        );
        Ok(target)
    }
}

fn is_complete_entry(dir: &Path, key: &CacheKey) -> bool {
    match load_entry(dir) {
        Some(entry) if entry.matches(key) => dir.is_dir(),
        Some(_) => {
            warn!("Cache marker in {} names another entry", dir.display());
            false
        }
        None => false,
    }
}

/// Copies `src` into `staging`, writes the marker, then renames it to `target`.
///
/// A complete entry already at `target` wins and the staging copy is
/// discarded. An incomplete directory at `target` is replaced.
fn place_entry(src: &Path, staging: &Path, target: &Path, key: &CacheKey) -> Result<u64> {
    if let Some(existing) = complete_entry_size(target, key) {
        debug!("{} is already cached", key);
        return Ok(existing);
    }

    let size = copy_dir_recursive(src, staging)?;
    write_entry(staging, &CachedEntry::new(key, size))?;

    if target.exists() && !is_complete_entry(target, key) {
        warn!("Replacing incomplete cache entry at {}", target.display());
        fs::remove_dir_all(target)
            .with_context(|| format!("Failed to remove {}", target.display()))?;
    }

    if let Err(e) = fs::rename(staging, target) {
        let _ = fs::remove_dir_all(staging);
        if let Some(existing) = complete_entry_size(target, key) {
            debug!("Another writer stored {} first", target.display());
            return Ok(existing);
        }
        return Err(e)
            .with_context(|| format!("Failed to move cache entry into {}", target.display()));
    }

    Ok(size)
}

fn complete_entry_size(dir: &Path, key: &CacheKey) -> Option<u64> {
    if !is_complete_entry(dir, key) {
        return None;
    }
    load_entry(dir).map(|entry| entry.size_bytes)
}

/// Recursively copies `src` to `dst`, returning bytes copied. Symlinks are skipped.
fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<u64> {
    fs::create_dir_all(dst)
        .with_context(|| format!("Failed to create directory: {}", dst.display()))?;

    let mut total = 0;
    for entry in fs::read_dir(src).with_context(|| format!("Failed to read {}", src.display()))? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let from = entry.path();
        let to = dst.join(entry.file_name());

        if file_type.is_dir() {
            total += copy_dir_recursive(&from, &to)?;
        } else if file_type.is_file() {
            total += fs::copy(&from, &to).with_context(|| {
                format!("Failed to copy {} to {}", from.display(), to.display())
            })?;
        }
    }
    Ok(total)
}
