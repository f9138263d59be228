//! Error taxonomy for the install pipeline.

use thiserror::Error;

use crate::toolchain::types::{Platform, ToolKind};

/// Errors surfaced by the install pipeline.
///
/// A missing executable after extraction is not an error: the locator
/// degrades to the extraction root and logs a warning instead.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Looking up the latest release failed. Drivers recover from this with
    /// a pinned fallback tag, so it only escapes when called directly.
    #[error("Failed to resolve latest release of {repository}: {reason}")]
    Resolution { repository: String, reason: String },

    #[error("{tool} has no release artifact for {platform}")]
    UnsupportedPlatform { tool: ToolKind, platform: String },

    #[error("Download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("Failed to extract {artifact} ({size} bytes): {reason}")]
    Extraction {
        artifact: String,
        size: u64,
        reason: String,
    },

    #[error("Tool cache error: {0}")]
    Cache(String),

    /// Filesystem failures and panicked blocking tasks.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallError {
    pub(crate) fn unsupported(tool: ToolKind, platform: Option<Platform>) -> Self {
        let platform = match platform {
            Some(p) => p.to_string(),
            None => format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        };
        Self::UnsupportedPlatform { tool, platform }
    }

    /// Builds an extraction error, using a distinct message for empty artifacts.
    pub(crate) fn extraction(artifact: &std::path::Path, size: u64, err: &anyhow::Error) -> Self {
        let reason = if size == 0 {
            "artifact is empty (0 bytes), the download produced no data".to_string()
        } else {
            format!("{err:#}")
        };
        Self::Extraction {
            artifact: artifact.display().to_string(),
            size,
            reason,
        }
    }
}

/// Result alias for pipeline operations.
pub type InstallResult<T> = Result<T, InstallError>;
