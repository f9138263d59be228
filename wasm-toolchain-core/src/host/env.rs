//! PATH helpers.
//!
//! Used by hosts to make installed tool directories visible to the rest of
//! the run and to subprocesses.

use std::path::Path;

/// Returns the PATH separator for the current platform.
#[inline]
pub fn path_separator() -> &'static str {
    #[cfg(windows)]
    {
        ";"
    }
    #[cfg(not(windows))]
    {
        ":"
    }
}

/// Prepends `dir` to an existing PATH value.
///
/// When `existing` is `None` the current process PATH is used. A directory
/// already at the front is not added twice.
pub fn prepend_to_path(dir: &Path, existing: Option<&str>) -> String {
    let sep = path_separator();
    let base_path = existing
        .map(|s| s.to_string())
        .or_else(|| std::env::var("PATH").ok())
        .unwrap_or_default();

    let dir = dir.to_string_lossy();

    if base_path.is_empty() {
        return dir.to_string();
    }
    if base_path.split(sep).next() == Some(dir.as_ref()) {
        return base_path;
    }

    format!("{}{}{}", dir, sep, base_path)
}

/// Returns true if `executable` exists directly under `dir`.
pub fn executable_in_dir(dir: &Path, executable: &str) -> bool {
    dir.join(executable).is_file()
}
