//! Release artifact extraction.
//!
//! Format selection, in priority order:
//!
//! 1. A recognized filename suffix (`.zip`, `.tar.gz`) is trusted.
//! 2. `.exe` artifacts are copied as-is into the destination.
//! 3. Otherwise the leading bytes are sniffed for gzip or zip magic.
//! 4. Failing that, tar extraction is attempted with an xz hint, then a gzip
//!    hint, then no compression; the first attempt that succeeds wins.
//!
//! Every failure is reported with the artifact's size attached.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::types::ArchiveKind;
use crate::error::{InstallError, InstallResult};

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
const ZIP_MAGIC: [u8; 2] = [0x50, 0x4B];

/// Compression hint for tar extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    Xz,
    Gz,
}

/// Order in which tar hints are tried when nothing else identifies the format.
const TAR_HINT_ORDER: [Option<TarCompression>; 3] =
    [Some(TarCompression::Xz), Some(TarCompression::Gz), None];

// ============================================================================
// Artifact Extraction
// ============================================================================

/// Extracts a downloaded artifact into `dest_dir` and returns `dest_dir`.
///
/// `declared` is the kind the release asset name advertises. When it is
/// `None` the artifact's own filename is consulted before sniffing.
/// `executable_name` names the copy when the artifact is a bare `.exe`.
///
/// # Errors
///
/// Returns [`InstallError::Extraction`] carrying the artifact size if no
/// strategy succeeds. Empty artifacts always fail with a dedicated message.
pub fn extract_artifact(
    archive_path: &Path,
    declared: Option<ArchiveKind>,
    dest_dir: &Path,
    executable_name: &str,
) -> InstallResult<PathBuf> {
    let size = fs::metadata(archive_path).map(|m| m.len()).unwrap_or(0);

    if size == 0 {
        return Err(InstallError::extraction(
            archive_path,
            0,
            &anyhow::anyhow!("empty artifact"),
        ));
    }

    info!(
        "Extracting {} ({} bytes) to {}",
        archive_path.display(),
        size,
        dest_dir.display()
    );

    select_and_extract(archive_path, declared, dest_dir, executable_name)
        .map(|()| dest_dir.to_path_buf())
        .map_err(|e| InstallError::extraction(archive_path, size, &e))
}

fn select_and_extract(
    archive_path: &Path,
    declared: Option<ArchiveKind>,
    dest_dir: &Path,
    executable_name: &str,
) -> Result<()> {
    let file_name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    match declared.or_else(|| ArchiveKind::from_file_name(&file_name)) {
        Some(ArchiveKind::Zip) => return extract_zip(archive_path, dest_dir),
        Some(ArchiveKind::TarGz) => {
            return extract_tar(archive_path, dest_dir, Some(TarCompression::Gz))
        }
        Some(ArchiveKind::Executable) => {
            return copy_executable(archive_path, dest_dir, executable_name)
        }
        None => {}
    }

    match sniff_magic(archive_path)? {
        Some(ArchiveKind::TarGz) => {
            debug!("Detected gzip magic in {}", file_name);
            extract_tar(archive_path, dest_dir, Some(TarCompression::Gz))
        }
        Some(ArchiveKind::Zip) => {
            debug!("Detected zip magic in {}", file_name);
            extract_zip(archive_path, dest_dir)
        }
        _ => extract_tar_any(archive_path, dest_dir),
    }
}

/// Inspects the first bytes of a file for gzip or zip signatures.
fn sniff_magic(path: &Path) -> Result<Option<ArchiveKind>> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut magic = [0u8; 2];
    let mut read = 0;
    while read < magic.len() {
        let n = file.read(&mut magic[read..])?;
        if n == 0 {
            return Ok(None);
        }
        read += n;
    }

    Ok(match magic {
        GZIP_MAGIC => Some(ArchiveKind::TarGz),
        ZIP_MAGIC => Some(ArchiveKind::Zip),
        _ => None,
    })
}

/// Tries each tar hint in turn, resetting the destination between attempts.
fn extract_tar_any(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let mut failures = Vec::new();

    for hint in TAR_HINT_ORDER {
        if dest_dir.exists() {
            fs::remove_dir_all(dest_dir)
                .with_context(|| format!("Failed to reset {}", dest_dir.display()))?;
        }

        match extract_tar(archive_path, dest_dir, hint) {
            Ok(()) => {
                debug!("Tar extraction succeeded with hint {:?}", hint);
                return Ok(());
            }
            Err(e) => {
                debug!("Tar extraction with hint {:?} failed: {:#}", hint, e);
                failures.push(format!("{:?}: {:#}", hint, e));
            }
        }
    }

    anyhow::bail!(
        "unrecognized archive format, every tar attempt failed ({})",
        failures.join("; ")
    )
}

// ============================================================================
// Executable Copy
// ============================================================================

fn copy_executable(archive_path: &Path, dest_dir: &Path, executable_name: &str) -> Result<()> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    let dest = dest_dir.join(executable_name);
    fs::copy(archive_path, &dest).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            archive_path.display(),
            dest.display()
        )
    })?;

    make_executable(&dest)
}

// ============================================================================
// ZIP Extraction
// ============================================================================

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open zip: {}", archive_path.display()))?;

    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read zip: {}", archive_path.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => path.to_owned(),
            None => {
                debug!("Skipping unsafe path in zip");
                continue;
            }
        };

        let dest_path = dest_dir.join(&entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut outfile = File::create(&dest_path)
                .with_context(|| format!("Failed to create: {}", dest_path.display()))?;

            io::copy(&mut entry, &mut outfile)?;

            #[cfg(unix)]
            set_unix_permissions(&dest_path, entry.unix_mode())?;
        }
    }

    debug!("ZIP extraction complete");
    Ok(())
}

// ============================================================================
// TAR Extraction
// ============================================================================

/// Extracts a tar archive, decompressing according to `hint`.
pub fn extract_tar(
    archive_path: &Path,
    dest_dir: &Path,
    hint: Option<TarCompression>,
) -> Result<()> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open tar: {}", archive_path.display()))?;
    let reader = BufReader::new(file);

    match hint {
        Some(TarCompression::Gz) => unpack_tar(flate2::read::GzDecoder::new(reader), dest_dir),
        Some(TarCompression::Xz) => unpack_tar(xz2::read::XzDecoder::new(reader), dest_dir),
        None => unpack_tar(reader, dest_dir),
    }
}

fn unpack_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    let dest_dir_canonical = dest_dir
        .canonicalize()
        .unwrap_or_else(|_| dest_dir.to_path_buf());
    let mut unpacked = 0usize;

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_type = entry.header().entry_type();

        if entry_type.is_symlink() || entry_type.is_hard_link() {
            warn!("Skipping symlink/hardlink in tar archive");
            continue;
        }

        let path = entry.path()?.into_owned();

        if path.is_absolute()
            || path
                .components()
                .any(|c| c == std::path::Component::ParentDir)
        {
            warn!("Skipping unsafe path in tar: {:?}", path);
            continue;
        }

        let dest_path = dest_dir.join(&path);

        let dest_canonical = if dest_path.exists() {
            dest_path.canonicalize()?
        } else if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
            let parent_canonical = parent.canonicalize()?;
            parent_canonical.join(dest_path.file_name().unwrap_or_default())
        } else {
            dest_path.clone()
        };

        if !dest_canonical.starts_with(&dest_dir_canonical) {
            warn!(
                "Skipping path that escapes dest_dir: {:?} -> {:?}",
                path, dest_canonical
            );
            continue;
        }

        if entry_type.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else if entry_type.is_file() {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut outfile = File::create(&dest_path)
                .with_context(|| format!("Failed to create: {}", dest_path.display()))?;
            io::copy(&mut entry, &mut outfile)?;
            outfile.flush()?;

            #[cfg(unix)]
            {
                if let Ok(mode) = entry.header().mode() {
                    set_unix_permissions(&dest_path, Some(mode))?;
                }
            }
        }
        unpacked += 1;
    }

    if unpacked == 0 {
        anyhow::bail!("tar archive contained no entries");
    }

    debug!("TAR extraction complete ({} entries)", unpacked);
    Ok(())
}

// ============================================================================
// System tar Fallback
// ============================================================================

/// Extracts a gzip tarball with the system `tar` binary.
///
/// Last resort for drivers that allow it; unavailable on Windows.
pub async fn extract_with_system_tar(archive_path: &Path, dest_dir: &Path) -> InstallResult<PathBuf> {
    let size = fs::metadata(archive_path).map(|m| m.len()).unwrap_or(0);
    let fail = |e: anyhow::Error| InstallError::extraction(archive_path, size, &e);

    if cfg!(windows) {
        return Err(fail(anyhow::anyhow!("system tar fallback is not available on Windows")));
    }
    if size == 0 {
        return Err(fail(anyhow::anyhow!("empty artifact")));
    }

    tokio::fs::create_dir_all(dest_dir)
        .await
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))
        .map_err(fail)?;

    info!(
        "Extracting {} with system tar into {}",
        archive_path.display(),
        dest_dir.display()
    );

    let output = tokio::process::Command::new("tar")
        .arg("-xzf")
        .arg(archive_path)
        .arg("-C")
        .arg(dest_dir)
        .output()
        .await
        .context("Failed to run tar")
        .map_err(fail)?;

    if !output.status.success() {
        return Err(fail(anyhow::anyhow!(
            "tar exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(dest_dir.to_path_buf())
}

// ============================================================================
// Unix Permissions
// ============================================================================

#[cfg(unix)]
fn set_unix_permissions(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        if mode & 0o111 != 0 {
            let permissions = fs::Permissions::from_mode(mode | 0o755);
            fs::set_permissions(path, permissions)
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }
    }

    Ok(())
}

/// Sets executable permission on a file (Unix only).
///
/// On Windows, this is a no-op.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to get metadata for {}", path.display()))?;

        let mut permissions = metadata.permissions();
        let current_mode = permissions.mode();
        permissions.set_mode(current_mode | 0o755);

        fs::set_permissions(path, permissions).with_context(|| {
            format!("Failed to set executable permission on {}", path.display())
        })?;

        debug!("Set executable permission on {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tar_gz_bytes, write_file};
    use tempfile::TempDir;

    fn plain_tar_bytes(name: &str, data: &[u8]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_path(name).unwrap();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append(&header, data).unwrap();
        builder.into_inner().unwrap()
    }

    fn zip_bytes(name: &str, data: &[u8]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        zip.start_file(name, options).unwrap();
        zip.write_all(data).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extract_tar_gz_by_suffix() {
        let temp = TempDir::new().unwrap();
        let archive = write_file(
            temp.path(),
            "binaryen-version_123-x86_64-linux.tar.gz",
            &tar_gz_bytes(&[("binaryen-version_123/bin/wasm-opt", b"#!/bin/sh\n", 0o755)]),
        );
        let dest = temp.path().join("out");

        let root = extract_artifact(&archive, None, &dest, "wasm-opt").unwrap();
        assert_eq!(root, dest);
        assert!(dest.join("binaryen-version_123/bin/wasm-opt").is_file());
    }

    #[test]
    fn test_extract_zip_by_suffix() {
        let temp = TempDir::new().unwrap();
        let archive = write_file(temp.path(), "tool.zip", &zip_bytes("bin/tool", b"zip content"));
        let dest = temp.path().join("out");

        extract_artifact(&archive, None, &dest, "tool").unwrap();
        assert_eq!(
            fs::read_to_string(dest.join("bin/tool")).unwrap(),
            "zip content"
        );
    }

    #[test]
    fn test_exe_artifact_is_copied() {
        let temp = TempDir::new().unwrap();
        let archive = write_file(temp.path(), "wasm-pack-init.exe", b"MZ fake installer");
        let dest = temp.path().join("out");

        extract_artifact(&archive, None, &dest, "wasm-pack.exe").unwrap();
        let copied = dest.join("wasm-pack.exe");
        assert_eq!(fs::read(&copied).unwrap(), b"MZ fake installer");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&copied).unwrap().permissions().mode();
            assert_ne!(mode & 0o111, 0);
        }
    }

    #[test]
    fn test_declared_kind_wins_over_file_name() {
        let temp = TempDir::new().unwrap();
        let archive = write_file(temp.path(), "0-download", b"MZ fake installer");
        let dest = temp.path().join("out");

        extract_artifact(&archive, Some(ArchiveKind::Executable), &dest, "wasm-pack.exe")
            .unwrap();
        assert_eq!(
            fs::read(dest.join("wasm-pack.exe")).unwrap(),
            b"MZ fake installer"
        );
    }

    #[test]
    fn test_unlabeled_gzip_is_sniffed() {
        let temp = TempDir::new().unwrap();
        let archive = write_file(
            temp.path(),
            "download",
            &tar_gz_bytes(&[("wasm-pack", b"bin", 0o755)]),
        );
        let dest = temp.path().join("out");

        extract_artifact(&archive, None, &dest, "wasm-pack").unwrap();
        assert!(dest.join("wasm-pack").is_file());
    }

    #[test]
    fn test_unlabeled_zip_is_sniffed() {
        let temp = TempDir::new().unwrap();
        let archive = write_file(temp.path(), "download.bin", &zip_bytes("wasm-opt", b"x"));
        let dest = temp.path().join("out");

        extract_artifact(&archive, None, &dest, "wasm-opt").unwrap();
        assert!(dest.join("wasm-opt").is_file());
    }

    #[test]
    fn test_unlabeled_xz_tar_uses_hint_chain() {
        let temp = TempDir::new().unwrap();
        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
        encoder
            .write_all(&plain_tar_bytes("wasm-opt", b"xz payload"))
            .unwrap();
        let archive = write_file(temp.path(), "artifact", &encoder.finish().unwrap());
        let dest = temp.path().join("out");

        extract_artifact(&archive, None, &dest, "wasm-opt").unwrap();
        assert_eq!(fs::read(dest.join("wasm-opt")).unwrap(), b"xz payload");
    }

    #[test]
    fn test_unlabeled_plain_tar_uses_last_hint() {
        let temp = TempDir::new().unwrap();
        let archive = write_file(
            temp.path(),
            "artifact.data",
            &plain_tar_bytes("nested/wasm-opt", b"plain"),
        );
        let dest = temp.path().join("out");

        extract_artifact(&archive, None, &dest, "wasm-opt").unwrap();
        assert_eq!(fs::read(dest.join("nested/wasm-opt")).unwrap(), b"plain");
    }

    #[test]
    fn test_garbage_fails_with_size() {
        let temp = TempDir::new().unwrap();
        let archive = write_file(temp.path(), "artifact", &[0xAB; 37]);
        let dest = temp.path().join("out");

        let err = extract_artifact(&archive, None, &dest, "wasm-opt").unwrap_err();
        assert!(matches!(err, InstallError::Extraction { size: 37, .. }));
        assert!(err.to_string().contains("37 bytes"));
    }

    #[test]
    fn test_empty_artifact_fails_before_extraction() {
        let temp = TempDir::new().unwrap();
        let archive = write_file(temp.path(), "tool.tar.gz", b"");
        let dest = temp.path().join("out");

        let err = extract_artifact(&archive, None, &dest, "tool").unwrap_err();
        assert!(matches!(err, InstallError::Extraction { size: 0, .. }));
        assert!(err.to_string().contains("empty"));
        assert!(!dest.exists());
    }

    #[test]
    fn test_corrupt_tar_gz_suffix_fails() {
        let temp = TempDir::new().unwrap();
        let archive = write_file(temp.path(), "tool.tar.gz", b"definitely not gzip");
        let err = extract_artifact(&archive, None, &temp.path().join("out"), "tool").unwrap_err();
        assert!(matches!(err, InstallError::Extraction { size: 19, .. }));
    }

    #[test]
    fn test_tar_symlink_escape_blocked() {
        let temp = TempDir::new().unwrap();
        let archive_path = temp.path().join("malicious.tar.gz");
        let extract_dir = temp.path().join("extracted");
        let escape_target = temp.path().join("escaped_file.txt");

        {
            let file = File::create(&archive_path).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);

            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_mode(0o777);
            builder
                .append_link(&mut header, "escape_link", "../escaped_file.txt")
                .unwrap();

            let data = b"This should NOT appear outside extraction dir!";
            let mut file_header = tar::Header::new_gnu();
            file_header.set_path("escape_link").unwrap();
            file_header.set_size(data.len() as u64);
            file_header.set_mode(0o644);
            file_header.set_cksum();
            builder.append(&file_header, &data[..]).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        extract_artifact(&archive_path, None, &extract_dir, "tool").unwrap();

        assert!(!escape_target.exists());
        assert!(extract_dir.join("escape_link").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_tar_fallback() {
        let temp = TempDir::new().unwrap();
        let archive = write_file(
            temp.path(),
            "b.tar.gz",
            &tar_gz_bytes(&[("binaryen-version_1/bin/wasm-opt", b"x", 0o755)]),
        );
        let dest = temp.path().join("system");

        let root = extract_with_system_tar(&archive, &dest).await.unwrap();
        assert!(root.join("binaryen-version_1/bin/wasm-opt").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let file_path = write_file(temp_dir.path(), "script.sh", b"#!/bin/bash\necho hello");
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o644)).unwrap();

        make_executable(&file_path).unwrap();

        let metadata = fs::metadata(&file_path).unwrap();
        assert_ne!(metadata.permissions().mode() & 0o111, 0);
    }
}
