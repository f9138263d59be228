//! Core types for toolchain installation.
//!
//! This module defines the foundational types shared by every pipeline stage:
//! tool identifiers, host platform detection, archive kinds and the
//! dependency / archive descriptors threaded between stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel version that asks for the newest published release.
pub const LATEST: &str = "latest";

// ============================================================================
// Tool Identifiers
// ============================================================================

/// The tool families this crate knows how to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    /// wasm-pack - Rust to WebAssembly build tool.
    WasmPack,
    /// Binaryen - WebAssembly optimizer suite (wasm-opt and friends).
    Binaryen,
}

impl ToolKind {
    /// Returns the identifier used for cache keys and log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WasmPack => "wasm-pack",
            Self::Binaryen => "binaryen",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Platform Detection
// ============================================================================

/// Operating systems with known archive-naming rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostOs {
    Linux,
    Macos,
    Windows,
}

/// CPU architectures with known archive-naming rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostArch {
    X86_64,
    Arm64,
}

impl HostArch {
    /// Returns the architecture segment used in cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86_64 => "x64",
            Self::Arm64 => "arm64",
        }
    }
}

/// A host platform: OS plus architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: HostOs,
    pub arch: HostArch,
}

impl Platform {
    pub const fn new(os: HostOs, arch: HostArch) -> Self {
        Self { os, arch }
    }

    /// Detects the current platform at runtime.
    ///
    /// Returns `None` if the platform is unsupported.
    pub fn detect() -> Option<Self> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Maps `std::env::consts`-style OS and architecture names to a platform.
    pub fn from_parts(os: &str, arch: &str) -> Option<Self> {
        let os = match os {
            "linux" => HostOs::Linux,
            "macos" => HostOs::Macos,
            "windows" => HostOs::Windows,
            _ => return None,
        };
        let arch = match arch {
            "x86_64" => HostArch::X86_64,
            "aarch64" | "arm64" => HostArch::Arm64,
            _ => return None,
        };
        Some(Self { os, arch })
    }

    pub fn is_windows(&self) -> bool {
        self.os == HostOs::Windows
    }

    /// Returns a human-readable description of the platform.
    pub fn display_name(&self) -> &'static str {
        match (self.os, self.arch) {
            (HostOs::Linux, HostArch::X86_64) => "Linux (x86_64)",
            (HostOs::Linux, HostArch::Arm64) => "Linux (ARM64)",
            (HostOs::Macos, HostArch::X86_64) => "macOS (Intel)",
            (HostOs::Macos, HostArch::Arm64) => "macOS (Apple Silicon)",
            (HostOs::Windows, HostArch::X86_64) => "Windows (x86_64)",
            (HostOs::Windows, HostArch::Arm64) => "Windows (ARM64)",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Archive Kinds
// ============================================================================

/// Container format of a downloaded release artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveKind {
    /// Gzip-compressed tar archive (.tar.gz, .tgz)
    TarGz,
    /// ZIP archive (.zip)
    Zip,
    /// A bare executable (no extraction)
    Executable,
}

impl ArchiveKind {
    /// Infers the archive kind from a URL or filename suffix.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".exe") {
            Some(Self::Executable)
        } else {
            None
        }
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// A tool requested by the user, before version resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub tool: ToolKind,
    /// `latest` or an explicit version in whatever format the user typed.
    pub requested: String,
}

impl Dependency {
    pub fn new(tool: ToolKind, requested: impl Into<String>) -> Self {
        let requested = requested.into();
        let requested = if requested.trim().is_empty() {
            LATEST.to_string()
        } else {
            requested.trim().to_string()
        };
        Self { tool, requested }
    }

    pub fn is_latest(&self) -> bool {
        self.requested.eq_ignore_ascii_case(LATEST)
    }
}

/// How a canonical version tag was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSource {
    /// The user named a version; only its formatting was normalized.
    Explicit,
    /// The release host reported this tag as the newest release.
    Latest,
    /// The latest lookup failed and the pinned fallback tag was used.
    Fallback { reason: String },
}

/// A dependency after version resolution. Never carries the `latest` sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub tool: ToolKind,
    pub requested: String,
    /// Canonical, tool-specific version tag (e.g. `v0.13.1`, `version_123`).
    pub version: String,
    pub source: VersionSource,
}

impl ResolvedDependency {
    pub fn used_fallback(&self) -> bool {
        matches!(self.source, VersionSource::Fallback { .. })
    }
}

/// Where to download a release artifact from. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDescriptor {
    pub file_name: String,
    pub url: String,
    /// Format the asset name declares, handed to the extractor.
    /// `None` when the filename suffix is not recognized.
    pub kind: Option<ArchiveKind>,
}
