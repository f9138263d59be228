//! wasm-toolchain core library
//!
//! Installs wasm-pack and Binaryen from their GitHub releases for CI runs:
//!
//! - Version resolution with pinned fallbacks when the release API is down
//! - Per-platform release artifact naming
//! - Streaming downloads with empty-file detection
//! - Multi-format extraction (tar.gz, zip, bare executables, sniffed formats)
//! - Executable discovery inside unpredictable archive layouts
//! - A persistent tool cache keyed by tool, version and architecture
//! - The GitHub Actions host facade (inputs, outputs, PATH, annotations)

pub mod action;
pub mod config;
pub mod error;
pub mod host;
pub mod toolchain;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use action::{run_action, run_with_installer, ActionOutcome};
pub use config::Settings;
pub use error::{InstallError, InstallResult};
pub use host::{ActionHost, GithubActionsHost};
pub use toolchain::{
    Dependency, FsToolCache, InstalledTool, Platform, ReleaseClient, ResolvedDependency, RunDirs,
    ToolCache, ToolInstaller, ToolKind, VersionSource,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn exports_are_accessible() {
        fn _check_types(
            _settings: &Settings,
            _host: &GithubActionsHost,
            _cache: &FsToolCache,
            _installer: &ToolInstaller,
            _dependency: &Dependency,
            _resolved: &ResolvedDependency,
            _dirs: &RunDirs,
        ) {
        }
    }
}
