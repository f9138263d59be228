//! Tool catalog with per-tool naming rules.
//!
//! Each supported tool is described by a static [`ToolDriver`]: where its
//! releases live, the last-known-good tag to fall back to, how user input is
//! canonicalized into a release tag, how release archives are named per
//! platform, and where the executable usually sits inside an archive.

use regex::Regex;
use std::sync::OnceLock;

use super::types::{HostArch, HostOs, Platform, ToolKind};

/// Static description of one installable tool.
#[derive(Debug)]
pub struct ToolDriver {
    pub tool: ToolKind,
    pub display_name: &'static str,
    /// GitHub owner of the release repository.
    pub owner: &'static str,
    /// GitHub repository name.
    pub repo: &'static str,
    /// Tag used when the latest-release lookup fails.
    pub fallback_version: &'static str,
    /// Executable to look for, without platform suffix.
    pub executable: &'static str,
    /// Turns user input into the canonical tag format.
    pub normalize_version: fn(&str) -> String,
    /// Release asset filename for a tag on a platform, `None` if unsupported.
    pub archive_name: fn(&str, Platform) -> Option<String>,
    /// Archive-relative directories checked before the generic scan.
    pub search_dirs: fn(&str) -> Vec<String>,
    /// Whether a failed extraction may be retried with the system `tar`
    /// after a fresh download (never on Windows).
    pub system_tar_fallback: bool,
}

impl ToolDriver {
    /// Returns `owner/repo`.
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Returns the executable filename for the given platform.
    pub fn executable_name(&self, platform: Platform) -> String {
        if platform.is_windows() {
            format!("{}.exe", self.executable)
        } else {
            self.executable.to_string()
        }
    }
}

// ============================================================================
// wasm-pack Definition
// ============================================================================

const WASM_PACK_FALLBACK_VERSION: &str = "v0.13.1";

/// `0.13.1` -> `v0.13.1`; already prefixed tags are kept.
fn wasm_pack_normalize(version: &str) -> String {
    let version = version.trim();
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{}", version)
    }
}

/// wasm-pack only publishes x86_64 builds; ARM hosts get the x86_64 archive.
/// Windows ships a standalone installer executable instead of an archive.
fn wasm_pack_archive_name(version: &str, platform: Platform) -> Option<String> {
    let triple = match platform.os {
        HostOs::Linux => "x86_64-unknown-linux-musl",
        HostOs::Macos => "x86_64-apple-darwin",
        HostOs::Windows => return Some("wasm-pack-init.exe".to_string()),
    };
    Some(format!("wasm-pack-{}-{}.tar.gz", version, triple))
}

fn wasm_pack_search_dirs(_version: &str) -> Vec<String> {
    vec!["wasm-pack/bin".to_string(), "wasm-pack".to_string()]
}

const WASM_PACK_DRIVER: ToolDriver = ToolDriver {
    tool: ToolKind::WasmPack,
    display_name: "wasm-pack",
    owner: "rustwasm",
    repo: "wasm-pack",
    fallback_version: WASM_PACK_FALLBACK_VERSION,
    executable: "wasm-pack",
    normalize_version: wasm_pack_normalize,
    archive_name: wasm_pack_archive_name,
    search_dirs: wasm_pack_search_dirs,
    system_tar_fallback: false,
};

// ============================================================================
// Binaryen Definition
// ============================================================================

const BINARYEN_FALLBACK_VERSION: &str = "version_123";

fn binaryen_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:version_|v)?(\d+)$").expect("binaryen version pattern is valid")
    })
}

/// `118`, `v118` and `version_118` all become `version_118`.
/// Anything else is passed through untouched.
fn binaryen_normalize(version: &str) -> String {
    let version = version.trim();
    match binaryen_version_pattern().captures(version) {
        Some(caps) => format!("version_{}", &caps[1]),
        None => version.to_string(),
    }
}

fn binaryen_archive_name(version: &str, platform: Platform) -> Option<String> {
    let target = match (platform.os, platform.arch) {
        (HostOs::Linux, HostArch::X86_64) => "x86_64-linux",
        (HostOs::Linux, HostArch::Arm64) => "aarch64-linux",
        (HostOs::Macos, HostArch::X86_64) => "x86_64-macos",
        (HostOs::Macos, HostArch::Arm64) => "arm64-macos",
        (HostOs::Windows, _) => "x86_64-windows",
    };
    Some(format!("binaryen-{}-{}.tar.gz", version, target))
}

/// Binaryen archives unpack into `binaryen-<tag>/bin/`.
fn binaryen_search_dirs(version: &str) -> Vec<String> {
    let nested = format!("binaryen-{}", version);
    vec![format!("{}/bin", nested), nested]
}

const BINARYEN_DRIVER: ToolDriver = ToolDriver {
    tool: ToolKind::Binaryen,
    display_name: "Binaryen",
    owner: "WebAssembly",
    repo: "binaryen",
    fallback_version: BINARYEN_FALLBACK_VERSION,
    executable: "wasm-opt",
    normalize_version: binaryen_normalize,
    archive_name: binaryen_archive_name,
    search_dirs: binaryen_search_dirs,
    system_tar_fallback: true,
};

// ============================================================================
// Catalog Access
// ============================================================================

/// Returns the driver for a given tool.
pub fn get_driver(tool: ToolKind) -> &'static ToolDriver {
    match tool {
        ToolKind::WasmPack => &WASM_PACK_DRIVER,
        ToolKind::Binaryen => &BINARYEN_DRIVER,
    }
}
