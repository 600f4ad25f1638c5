//! Multi-format archive extraction and executable installation.
//!
//! Dispatches on the archive suffix (zip, 7z, tar with gzip/bzip2/xz),
//! extracts into a fresh scratch directory, then hunts the extracted
//! tree for executables whose name shares the archive's inferred tool
//! prefix and copies them into a binary directory.

use std::collections::BTreeSet;
use std::fs::{self, File, Permissions};
use std::io::{self, BufReader, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::paths::Dirs;
use toolsync_schema::{ArchiveKind, infer_tool_name};

/// Errors from extraction or executable installation.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Filesystem failure while extracting or copying.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The zip archive is corrupt or unreadable.
    #[error("failed to read zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The 7z archive is corrupt or unreadable.
    #[error("failed to read 7z archive: {0}")]
    SevenZ(String),

    /// The filename carries no recognized archive suffix.
    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// Extraction succeeded but nothing in the tree qualifies as an
    /// executable for the inferred tool name.
    #[error("no binary found in {}", .0.display())]
    NoBinaryFound(PathBuf),
}

/// Result of extracting an archive: where the content root is, and the
/// top-level entry names that were seen.
#[derive(Debug)]
pub struct ExtractedTree {
    /// Directory (or single file) to search for executables.
    pub root: PathBuf,
    /// Distinct top-level entry names in the archive.
    pub top_level: Vec<String>,
}

/// Extract `archive` under a scratch directory inside `work_dir`, find
/// the executables matching the archive's inferred tool prefix, and
/// install them into the system binary directory (falling back to the
/// per-user directory on the first copy failure).
///
/// Returns the final location of the first installed binary.
///
/// # Errors
///
/// Fails when the format is unrecognized, the archive is unreadable, no
/// executable is found, or neither binary directory is writable.
pub fn extract_and_install(
    archive: &Path,
    work_dir: &Path,
    dirs: &Dirs,
) -> Result<PathBuf, ExtractError> {
    let scratch = tempfile::Builder::new()
        .prefix("extract-")
        .tempdir_in(work_dir)?;

    let tree = extract_archive(archive, scratch.path())?;

    let file_name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let tool_name = infer_tool_name(file_name);

    let binaries = if tree.root.is_file() {
        vec![tree.root.clone()]
    } else {
        find_executables(&tree.root, tool_name)
    };

    if binaries.is_empty() {
        return Err(ExtractError::NoBinaryFound(tree.root));
    }

    install_binaries(&binaries, dirs)
}

/// Extract an archive into `dest`, dispatching on the filename suffix.
///
/// # Errors
///
/// Fails when the suffix is not a recognized archive format or the
/// archive cannot be read.
pub fn extract_archive(src: &Path, dest: &Path) -> Result<ExtractedTree, ExtractError> {
    let kind = ArchiveKind::from_path(src).ok_or_else(|| {
        ExtractError::UnsupportedFormat(src.file_name().map_or_else(
            || src.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        ))
    })?;
    tracing::debug!(archive = %src.display(), ?kind, "extracting");

    fs::create_dir_all(dest)?;

    let top_level = match kind {
        ArchiveKind::Zip => extract_zip(src, dest)?,
        ArchiveKind::SevenZ => extract_7z(src, dest)?,
        ArchiveKind::Tar | ArchiveKind::TarGz | ArchiveKind::TarBz2 | ArchiveKind::TarXz => {
            extract_tar(src, dest, kind)?
        }
    };

    Ok(resolve_root(dest, top_level))
}

/// Decide the content root from the observed top-level entries. A single
/// common root is the usual case; anything else is ambiguous, so the
/// whole extraction directory becomes the root and discovery scans it
/// all.
fn resolve_root(dest: &Path, top_level: BTreeSet<String>) -> ExtractedTree {
    let names: Vec<String> = top_level.into_iter().collect();
    let root = match names.as_slice() {
        [single] => dest.join(single),
        [] => dest.to_path_buf(),
        _ => {
            tracing::warn!(
                entries = ?names,
                "archive has multiple top-level entries, searching the whole tree"
            );
            dest.to_path_buf()
        }
    };
    ExtractedTree {
        root,
        top_level: names,
    }
}

/// Reject absolute paths and parent-directory traversal.
fn safe_entry_path(path: &Path) -> bool {
    !path.is_absolute()
        && !path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
}

fn first_component(path: &Path) -> Option<String> {
    path.components().next().and_then(|c| match c {
        Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
        _ => None,
    })
}

fn extract_tar(src: &Path, dest: &Path, kind: ArchiveKind) -> Result<BTreeSet<String>, ExtractError> {
    let file = File::open(src)?;
    let reader = BufReader::new(file);

    let decoder: Box<dyn Read> = match kind {
        ArchiveKind::TarGz => Box::new(flate2::read::GzDecoder::new(reader)),
        ArchiveKind::TarBz2 => Box::new(bzip2::read::BzDecoder::new(reader)),
        ArchiveKind::TarXz => Box::new(xz2::read::XzDecoder::new(reader)),
        _ => Box::new(reader),
    };

    let mut archive = tar::Archive::new(decoder);
    let mut top_level = BTreeSet::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_type = entry.header().entry_type();
        let path = entry.path()?.into_owned();

        if !safe_entry_path(&path) {
            tracing::warn!(path = %path.display(), "skipping unsafe tar entry");
            continue;
        }
        if let Some(name) = first_component(&path) {
            top_level.insert(name);
        }

        let target = dest.join(&path);
        if entry_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry_type.is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
            if let Ok(mode) = entry.header().mode() {
                fs::set_permissions(&target, Permissions::from_mode(mode & 0o7777))?;
            }
        }
        // Links and specials are not carried over.
    }

    Ok(top_level)
}

fn extract_zip(src: &Path, dest: &Path) -> Result<BTreeSet<String>, ExtractError> {
    let file = File::open(src)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut top_level = BTreeSet::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(path) = entry.enclosed_name() else {
            tracing::warn!(name = entry.name(), "skipping unsafe zip entry");
            continue;
        };

        if let Some(name) = first_component(&path) {
            top_level.insert(name);
        }

        let target = dest.join(&path);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
            fs::set_permissions(&target, Permissions::from_mode(0o755))?;
        }
    }

    Ok(top_level)
}

fn extract_7z(src: &Path, dest: &Path) -> Result<BTreeSet<String>, ExtractError> {
    sevenz_rust::decompress_file(src, dest).map_err(|e| ExtractError::SevenZ(e.to_string()))?;

    // sevenz-rust extracts wholesale; recover the top-level names from
    // the destination itself.
    let mut top_level = BTreeSet::new();
    for entry in fs::read_dir(dest)? {
        top_level.insert(entry?.file_name().to_string_lossy().into_owned());
    }
    Ok(top_level)
}

/// Walk `root` for regular files whose name starts with `prefix` and
/// which look executable: any execute permission bit, or an
/// executable/object format reported by `file --brief` when the bits
/// are inconclusive.
fn find_executables(root: &Path, prefix: &str) -> Vec<PathBuf> {
    tracing::debug!(root = %root.display(), prefix, "scanning for executables");
    let mut found = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(%err, "error walking extracted tree");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !name.starts_with(prefix) {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if metadata.permissions().mode() & 0o111 != 0 {
            found.push(entry.into_path());
            continue;
        }
        if probe_is_executable(entry.path()) {
            found.push(entry.into_path());
        }
    }

    found
}

/// Ask the platform's file-type inspector whether this is an executable.
fn probe_is_executable(path: &Path) -> bool {
    let Ok(output) = std::process::Command::new("file")
        .arg("--brief")
        .arg(path)
        .output()
    else {
        return false;
    };
    let text = String::from_utf8_lossy(&output.stdout).to_lowercase();
    text.contains("executable") || text.contains("mach-o") || text.contains("elf")
}

/// Copy every binary into the system bin dir; the first failure switches
/// the whole batch to the per-user bin dir (created on demand). Returns
/// the first installed path.
fn install_binaries(binaries: &[PathBuf], dirs: &Dirs) -> Result<PathBuf, ExtractError> {
    let mut dest_dir = dirs.system_bin.clone();
    let mut first: Option<PathBuf> = None;

    for binary in binaries {
        let installed = match copy_binary(binary, &dest_dir) {
            Ok(path) => path,
            Err(err) if dest_dir == dirs.system_bin => {
                tracing::warn!(
                    %err,
                    dir = %dest_dir.display(),
                    "cannot write system bin dir, falling back to user bin"
                );
                fs::create_dir_all(&dirs.user_bin)?;
                dest_dir = dirs.user_bin.clone();
                copy_binary(binary, &dest_dir)?
            }
            Err(err) => return Err(err.into()),
        };
        if first.is_none() {
            first = Some(installed);
        }
    }

    first.ok_or_else(|| ExtractError::NoBinaryFound(dirs.system_bin.clone()))
}

fn copy_binary(src: &Path, dest_dir: &Path) -> io::Result<PathBuf> {
    let name = src.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "binary has no file name")
    })?;
    let dest = dest_dir.join(name);
    fs::copy(src, &dest)?;
    fs::set_permissions(&dest, Permissions::from_mode(0o755))?;
    Ok(dest)
}

/// Install a single already-downloaded executable under `name`, trying
/// the system bin dir first and the per-user dir on permission denial.
///
/// # Errors
///
/// Fails when the copy fails for a reason other than permissions, or
/// when the fallback copy also fails.
pub fn install_executable(src: &Path, name: &str, dirs: &Dirs) -> Result<PathBuf, ExtractError> {
    fs::set_permissions(src, Permissions::from_mode(0o755))?;

    let target = dirs.system_bin.join(name);
    match fs::copy(src, &target) {
        Ok(_) => {
            fs::set_permissions(&target, Permissions::from_mode(0o755))?;
            Ok(target)
        }
        Err(err)
            if err.kind() == io::ErrorKind::PermissionDenied
                || err.kind() == io::ErrorKind::NotADirectory =>
        {
            tracing::warn!(
                dir = %dirs.system_bin.display(),
                "permission denied writing system bin dir, falling back to user bin"
            );
            fs::create_dir_all(&dirs.user_bin)?;
            let fallback = dirs.user_bin.join(name);
            fs::copy(src, &fallback)?;
            fs::set_permissions(&fallback, Permissions::from_mode(0o755))?;
            Ok(fallback)
        }
        Err(err) => Err(err.into()),
    }
}
