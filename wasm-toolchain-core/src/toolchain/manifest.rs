//! Cache entry markers.
//!
//! Every cache entry directory carries a small JSON marker describing what it
//! holds. The marker is written into the staging copy before it is renamed
//! into place, so an entry directory either has a complete marker or was not
//! produced by a finished store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

use super::types::ToolKind;

/// Current schema version for entry markers.
const SCHEMA_VERSION: u32 = 1;

/// Marker filename inside each cache entry directory.
pub const ENTRY_MARKER: &str = ".wasm-toolchain-entry.json";

// ============================================================================
// Entry Data Structures
// ============================================================================

/// Identifies one cached extraction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub tool: ToolKind,
    pub version: String,
    pub arch: String,
}

impl CacheKey {
    pub fn new(tool: ToolKind, version: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            tool,
            version: version.into(),
            arch: arch.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tool, self.version, self.arch)
    }
}

/// Contents of an entry marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    pub tool: ToolKind,
    pub version: String,
    pub arch: String,
    /// When the entry was written.
    pub cached_at: DateTime<Utc>,
    /// Total size of the cached tree in bytes, marker excluded.
    pub size_bytes: u64,
}

impl CachedEntry {
    pub fn new(key: &CacheKey, size_bytes: u64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            tool: key.tool,
            version: key.version.clone(),
            arch: key.arch.clone(),
            cached_at: Utc::now(),
            size_bytes,
        }
    }

    pub fn matches(&self, key: &CacheKey) -> bool {
        self.tool == key.tool && self.version == key.version && self.arch == key.arch
    }
}

// ============================================================================
// Marker Persistence
// ============================================================================

/// Reads the marker of the entry in `entry_dir`.
///
/// Never fails: a missing marker is `None`, and an unreadable or corrupted
/// one is logged and also `None`, so the entry counts as absent.
pub fn load_entry(entry_dir: &Path) -> Option<CachedEntry> {
    let path = entry_dir.join(ENTRY_MARKER);

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No cache marker at {}", path.display());
            return None;
        }
        Err(e) => {
            warn!("Failed to read cache marker {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str::<CachedEntry>(&content) {
        Ok(entry) => {
            if entry.schema_version != SCHEMA_VERSION {
                info!(
                    "Cache marker schema version {} differs from current {}",
                    entry.schema_version, SCHEMA_VERSION
                );
            }
            Some(entry)
        }
        Err(e) => {
            warn!("Failed to parse cache marker {}: {}", path.display(), e);
            None
        }
    }
}

/// Writes the marker for `entry` into `entry_dir`.
pub fn write_entry(entry_dir: &Path, entry: &CachedEntry) -> Result<()> {
    let path = entry_dir.join(ENTRY_MARKER);
    let content = serde_json::to_string_pretty(entry).context("Failed to serialize cache marker")?;
    fs::write(&path, content)
        .with_context(|| format!("Failed to write cache marker {}", path.display()))?;
    Ok(())
}
