//! Path management for downloads, extraction and the tool cache.
//!
//! Each run works below its own temp directory:
//!
//! - `{temp}/wasm-toolchain-{timestamp}-{id}/downloads/`
//! - `{temp}/wasm-toolchain-{timestamp}-{id}/extract/<tool>-<n>/`
//!
//! The timestamp plus a short random id keeps concurrent runs on a shared
//! machine apart. Nothing here is cleaned up; the host's temp policy applies.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Prefix for per-run temp directories and the fallback cache location.
const TEMP_PREFIX: &str = "wasm-toolchain";

/// Returns the default persistent cache directory.
///
/// Prefers the runner's tool cache, then the user cache dir, then temp.
pub fn default_cache_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("RUNNER_TOOL_CACHE").filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::cache_dir()
        .map(|d| d.join(TEMP_PREFIX))
        .unwrap_or_else(|| std::env::temp_dir().join(TEMP_PREFIX).join("cache"))
}

/// Scratch directories scoped to one run.
#[derive(Debug)]
pub struct RunDirs {
    root: PathBuf,
    counter: AtomicUsize,
}

impl RunDirs {
    /// Creates a fresh per-run directory under the OS temp dir.
    pub fn new() -> Result<Self> {
        Self::under(&std::env::temp_dir())
    }

    /// Creates a fresh per-run directory under `base`.
    pub fn under(base: &Path) -> Result<Self> {
        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
        let id = uuid::Uuid::new_v4().simple().to_string();
        let root = base.join(format!("{}-{}-{}", TEMP_PREFIX, stamp, &id[..8]));

        for dir in [root.join("downloads"), root.join("extract")] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }

        Ok(Self {
            root,
            counter: AtomicUsize::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path a download named `file_name` should be written to.
    /// Repeated downloads of the same file get distinct paths.
    pub fn download_path(&self, file_name: &str) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.root
            .join("downloads")
            .join(format!("{}-{}", n, file_name))
    }

    /// Returns a fresh, not-yet-existing extraction directory for `label`.
    pub fn extract_dir(&self, label: &str) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.root.join("extract").join(format!("{}-{}", label, n))
    }
}
