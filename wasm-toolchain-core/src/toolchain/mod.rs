//! Release resolution, download, extraction, binary discovery and caching
//! for the WebAssembly toolchain.
//!
//! Tools are described by static [`ToolDriver`] records in the catalog; the
//! [`ToolInstaller`] runs the shared pipeline for any of them.

pub mod archive;
pub mod cache;
pub mod catalog;
pub mod downloader;
pub mod extractor;
pub mod installer;
pub mod locator;
pub mod manifest;
pub mod paths;
pub mod release;
pub mod types;

pub use archive::{archive_descriptor, download_url, DEFAULT_DOWNLOAD_BASE};
pub use cache::{FsToolCache, ToolCache};
pub use catalog::{get_driver, ToolDriver};
pub use downloader::{download_file, DownloadProgress};
pub use extractor::{extract_artifact, extract_tar, extract_with_system_tar, TarCompression};
pub use installer::{InstalledTool, ToolInstaller};
pub use locator::{locate_binary, BinaryLocation};
pub use manifest::{CacheKey, CachedEntry, ENTRY_MARKER};
pub use paths::{default_cache_dir, RunDirs};
pub use release::{ensure_proper_version, ReleaseClient};
pub use types::{
    ArchiveDescriptor, ArchiveKind, Dependency, HostArch, HostOs, Platform, ResolvedDependency,
    ToolKind, VersionSource, LATEST,
};
