//! Finds the directory holding a tool's executable inside an extracted tree.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of a binary search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryLocation {
    /// Directory that contains the executable, or the search root as a best guess.
    pub dir: PathBuf,
    /// False when nothing matched and `dir` is only the fallback guess.
    pub found: bool,
}

/// Locates `executable` below `root`.
///
/// Candidates are checked in order, first match wins:
///
/// 1. `root` itself
/// 2. `root/bin`
/// 3. each of `known_dirs`, relative to `root`
/// 4. each immediate subdirectory in name order, checking the subdirectory
///    itself and then its own subdirectories before moving to the next one
///
/// The scan never goes deeper than two levels. If nothing matches, `root` is
/// returned with `found == false` and a warning is logged.
pub fn locate_binary(root: &Path, executable: &str, known_dirs: &[String]) -> BinaryLocation {
    let mut candidates = vec![root.to_path_buf(), root.join("bin")];
    candidates.extend(known_dirs.iter().map(|d| root.join(d)));

    if let Some(dir) = candidates
        .into_iter()
        .find(|dir| contains_executable(dir, executable))
    {
        debug!("Found {} in {}", executable, dir.display());
        return BinaryLocation { dir, found: true };
    }

    if let Some(dir) = scan_two_levels(root, executable) {
        debug!("Found {} by scanning in {}", executable, dir.display());
        return BinaryLocation { dir, found: true };
    }

    warn!(
        "Could not find {} under {}, falling back to the extraction root",
        executable,
        root.display()
    );
    BinaryLocation {
        dir: root.to_path_buf(),
        found: false,
    }
}

fn contains_executable(dir: &Path, executable: &str) -> bool {
    dir.join(executable).is_file()
}

/// Sorted immediate subdirectories of `dir`; unreadable directories yield nothing.
fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect(),
        Err(_) => Vec::new(),
    };
    dirs.sort();
    dirs
}

fn scan_two_levels(root: &Path, executable: &str) -> Option<PathBuf> {
    subdirectories(root).into_iter().find_map(|dir| {
        if contains_executable(&dir, executable) {
            return Some(dir);
        }
        subdirectories(&dir)
            .into_iter()
            .find(|nested| contains_executable(nested, executable))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_file;
    use tempfile::TempDir;

    #[test]
    fn test_binary_at_root() {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "wasm-pack", b"x");

        let loc = locate_binary(temp.path(), "wasm-pack", &[]);
        assert_eq!(loc.dir, temp.path());
        assert!(loc.found);
    }

    #[test]
    fn test_binary_in_bin() {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "bin/wasm-opt", b"x");

        let loc = locate_binary(temp.path(), "wasm-opt", &[]);
        assert_eq!(loc.dir, temp.path().join("bin"));
        assert!(loc.found);
    }

    #[test]
    fn test_root_wins_over_bin() {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "wasm-opt", b"x");
        write_file(temp.path(), "bin/wasm-opt", b"x");

        assert_eq!(locate_binary(temp.path(), "wasm-opt", &[]).dir, temp.path());
    }

    #[test]
    fn test_known_dirs_are_checked_before_scan() {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "aaa/wasm-opt", b"decoy");
        write_file(temp.path(), "binaryen-version_118/bin/wasm-opt", b"x");

        let known = vec![
            "binaryen-version_118/bin".to_string(),
            "binaryen-version_118".to_string(),
        ];
        let loc = locate_binary(temp.path(), "wasm-opt", &known);
        assert_eq!(loc.dir, temp.path().join("binaryen-version_118/bin"));
    }

    #[test]
    fn test_generic_scan_finds_one_level_down() {
        let temp = TempDir::new().unwrap();
        write_file(
            temp.path(),
            "wasm-pack-v0.13.1-x86_64-unknown-linux-musl/wasm-pack",
            b"x",
        );

        let loc = locate_binary(temp.path(), "wasm-pack", &["wasm-pack/bin".to_string()]);
        assert_eq!(
            loc.dir,
            temp.path().join("wasm-pack-v0.13.1-x86_64-unknown-linux-musl")
        );
        assert!(loc.found);
    }

    #[test]
    fn test_generic_scan_finds_two_levels_down() {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "unexpected/layout/wasm-opt", b"x");

        let loc = locate_binary(temp.path(), "wasm-opt", &[]);
        assert_eq!(loc.dir, temp.path().join("unexpected/layout"));
        assert!(loc.found);
    }

    #[test]
    fn test_scan_finishes_each_subdirectory_first() {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "a-dist/bin/wasm-opt", b"nested");
        write_file(temp.path(), "b-dist/wasm-opt", b"shallow");

        let loc = locate_binary(temp.path(), "wasm-opt", &[]);
        assert_eq!(loc.dir, temp.path().join("a-dist/bin"));
        assert!(loc.found);
    }

    #[test]
    fn test_scan_is_bounded_at_two_levels() {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "a/b/c/wasm-opt", b"x");

        let loc = locate_binary(temp.path(), "wasm-opt", &[]);
        assert_eq!(loc.dir, temp.path());
        assert!(!loc.found);
    }

    #[test]
    fn test_missing_binary_degrades_to_root() {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "README.md", b"docs");

        let loc = locate_binary(temp.path(), "wasm-opt", &[]);
        assert_eq!(loc.dir, temp.path());
        assert!(!loc.found);
    }

    #[test]
    fn test_directory_named_like_binary_is_ignored() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("wasm-pack/bin")).unwrap();

        let loc = locate_binary(temp.path(), "wasm-pack", &[]);
        assert!(!loc.found);
    }
}
