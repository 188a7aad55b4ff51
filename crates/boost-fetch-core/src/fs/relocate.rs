//! Move-or-copy ownership transfer.
//!
//! A rename is attempted first. When it fails (typically because source and
//! target live on different filesystems or drives), the data is copied with
//! its permissions and the source is deleted afterwards.
//!
//! These helpers are not safe against other processes mutating the source or
//! target trees at the same time.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use walkdir::WalkDir;

use crate::Result;
use crate::fs::clean::remove_file_if_exists;

/// Moves a single file (or symlink) to `target`, replacing an existing file.
///
/// # Errors
///
/// Returns an error if both the rename and the copy fallback fail.
pub fn relocate_file(source: &Path, target: &Path) -> Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(
                source = %source.display(),
                target = %target.display(),
                error = %e,
                "rename failed, copying instead"
            );
            copy_preserving(source, target)?;
            remove_file_if_exists(source)
        }
    }
}

fn copy_preserving(source: &Path, target: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(source)?;
    if metadata.file_type().is_symlink() {
        return copy_symlink(source, target);
    }
    // fs::copy carries the permission bits over.
    fs::copy(source, target)?;
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> Result<()> {
    let link_target = fs::read_link(source)?;
    remove_file_if_exists(target)?;
    std::os::unix::fs::symlink(link_target, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, target: &Path) -> Result<()> {
    fs::copy(source, target)?;
    Ok(())
}

/// Moves the contents of `source` into `target`, merging with whatever
/// `target` already holds.
///
/// When `target` does not exist the whole tree is renamed in one step, so the
/// target appears fully formed. Otherwise (or if that rename fails) the tree
/// is walked: directories are recreated, files are moved one by one with
/// [`relocate_file`], and directory permissions are restored once their
/// contents are in place. Whatever remains of `source` is left to the caller.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked or any entry fails to move.
pub fn relocate_tree(source: &Path, target: &Path) -> Result<()> {
    if fs::symlink_metadata(target).is_err() {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        if fs::rename(source, target).is_ok() {
            return Ok(());
        }
    }

    let entries = WalkDir::new(source)
        .follow_links(false)
        .into_iter()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(io::Error::from)?;

    let mut directories: Vec<(PathBuf, fs::Permissions)> = Vec::new();
    for entry in entries {
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| io::Error::other(e.to_string()))?;
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
            if !relative.as_os_str().is_empty() {
                let permissions = entry.metadata().map_err(io::Error::from)?.permissions();
                directories.push((destination, permissions));
            }
        } else {
            relocate_file(entry.path(), &destination)?;
        }
    }

    // Deepest first, so read-only directories are sealed after their children.
    for (dir, permissions) in directories.into_iter().rev() {
        fs::set_permissions(&dir, permissions)?;
    }
    Ok(())
}
