//! Zip extraction and bundle discovery
//!
//! Archives are validated before anything touches the disk, unpacked into a
//! scratch directory, and searched for the shallowest entry carrying a
//! supported extension. Only that entry survives: it is moved into the
//! destination root and the scratch directory is removed.

use crate::error::{AppfetchError, AppfetchResult};
use crate::extensions::SupportedExtensions;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

/// Unpack `archive` and move the best-matching bundle into `dest_root`.
///
/// Scratch space is allocated under `scratch_parent` and released on every
/// exit path. Runs on the blocking thread pool.
pub async fn extract_bundle(
    archive: &Path,
    dest_root: &Path,
    scratch_parent: &Path,
    extensions: &SupportedExtensions,
) -> AppfetchResult<PathBuf> {
    let archive = archive.to_path_buf();
    let dest_root = dest_root.to_path_buf();
    let scratch_parent = scratch_parent.to_path_buf();
    let extensions = extensions.clone();

    tokio::task::spawn_blocking(move || {
        extract_bundle_blocking(&archive, &dest_root, &scratch_parent, &extensions)
    })
    .await
    .map_err(|e| AppfetchError::Internal(format!("extraction task failed: {}", e)))?
}

/// Synchronous counterpart of [`extract_bundle`]
pub fn extract_bundle_blocking(
    archive: &Path,
    dest_root: &Path,
    scratch_parent: &Path,
    extensions: &SupportedExtensions,
) -> AppfetchResult<PathBuf> {
    let mut zip = open_validated(archive)?;

    fs::create_dir_all(scratch_parent).map_err(|e| {
        AppfetchError::io(format!("creating directory {}", scratch_parent.display()), e)
    })?;
    let workspace = tempfile::Builder::new()
        .prefix("unzip-")
        .tempdir_in(scratch_parent)
        .map_err(|e| AppfetchError::io("creating extraction workspace", e))?;

    let result = unpack_and_select(&mut zip, archive, workspace.path(), dest_root, extensions);

    let workspace_path = workspace.path().to_path_buf();
    if let Err(e) = workspace.close() {
        warn!(
            "Failed to remove extraction workspace {}: {}",
            workspace_path.display(),
            e
        );
    }
    result
}

/// Open the archive and read every entry header, so corrupt archives fail
/// before extraction starts
fn open_validated(archive: &Path) -> AppfetchResult<ZipArchive<File>> {
    let file = File::open(archive)
        .map_err(|e| AppfetchError::io(format!("opening archive {}", archive.display()), e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| AppfetchError::invalid_archive(archive, e))?;

    for index in 0..zip.len() {
        zip.by_index_raw(index)
            .map_err(|e| AppfetchError::invalid_archive(archive, e))?;
    }
    debug!("Archive {} holds {} entries", archive.display(), zip.len());
    Ok(zip)
}

fn unpack_and_select(
    zip: &mut ZipArchive<File>,
    archive: &Path,
    workspace: &Path,
    dest_root: &Path,
    extensions: &SupportedExtensions,
) -> AppfetchResult<PathBuf> {
    zip.extract(workspace)
        .map_err(|e| AppfetchError::invalid_archive(archive, e))?;

    let winner = find_bundle(workspace, extensions)?.ok_or_else(|| {
        AppfetchError::NoBundleFound {
            archive: archive.to_path_buf(),
            extensions: extensions.to_string(),
        }
    })?;

    let relative = winner.strip_prefix(workspace).unwrap_or(&winner);
    info!(
        "Matched bundle '{}' in archive {}",
        relative.display(),
        archive.display()
    );
    move_into(&winner, dest_root)
}

/// Locate the shallowest entry whose extension is supported.
///
/// Entries are enumerated in file-name order; among equally deep matches
/// the first enumerated wins.
pub fn find_bundle(root: &Path, extensions: &SupportedExtensions) -> AppfetchResult<Option<PathBuf>> {
    let mut candidates: Vec<(usize, PathBuf)> = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            AppfetchError::io(
                format!("listing {}", root.display()),
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory loop")),
            )
        })?;
        if extensions.matches(entry.path()) {
            candidates.push((entry.depth(), entry.into_path()));
        }
    }

    candidates.sort_by_key(|(depth, _)| *depth);
    Ok(candidates.into_iter().next().map(|(_, path)| path))
}

/// Move a file or directory into `dest_root`, keeping its name
fn move_into(src: &Path, dest_root: &Path) -> AppfetchResult<PathBuf> {
    let name = src
        .file_name()
        .ok_or_else(|| AppfetchError::Internal(format!("no file name in {}", src.display())))?;
    let dest = dest_root.join(name);

    fs::create_dir_all(dest_root)
        .map_err(|e| AppfetchError::io(format!("creating directory {}", dest_root.display()), e))?;
    if dest.exists() {
        remove_any(&dest)
            .map_err(|e| AppfetchError::io(format!("replacing {}", dest.display()), e))?;
    }

    if let Err(e) = fs::rename(src, &dest) {
        debug!("Rename failed ({}), copying {} instead", e, src.display());
        copy_recursively(src, &dest)
            .map_err(|e| AppfetchError::io(format!("moving {} to {}", src.display(), dest.display()), e))?;
    }
    Ok(dest)
}

fn copy_recursively(src: &Path, dest: &Path) -> std::io::Result<()> {
    if src.is_file() {
        fs::copy(src, dest)?;
        return Ok(());
    }

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(std::io::Error::other)?;
        let relative = entry.path().strip_prefix(src).map_err(std::io::Error::other)?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn remove_any(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
