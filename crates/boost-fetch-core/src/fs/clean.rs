//! Recursive deletion.

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

use crate::Result;

/// Deletes `path` and everything below it.
///
/// Does nothing if `path` does not exist. Directories are removed only after
/// their children (post-order). Symlinks are removed, never followed.
///
/// Entries that disappear between listing and removal are ignored, which
/// tolerates but does not prevent concurrent modification of the tree.
///
/// # Errors
///
/// Returns an error if an entry exists but cannot be removed.
pub fn delete_recursively(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_dir() {
        return remove_file_if_exists(path);
    }

    for entry in WalkDir::new(path).follow_links(false).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.io_error().is_some_and(|io| io.kind() == io::ErrorKind::NotFound) => {
                continue;
            }
            Err(e) => return Err(io::Error::from(e).into()),
        };
        if entry.file_type().is_dir() {
            remove_dir_if_exists(entry.path())?;
        } else {
            remove_file_if_exists(entry.path())?;
        }
    }
    Ok(())
}

pub(crate) fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_path_is_noop() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("does-not-exist");
        delete_recursively(&missing).unwrap();
        assert!(!missing.exists());
    }

    #[test]
    fn test_deletes_tree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("tree");
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::write(root.join("top.txt"), "top").unwrap();
        fs::write(root.join("a/b/mid.txt"), "mid").unwrap();
        fs::write(root.join("a/b/c/leaf.txt"), "leaf").unwrap();

        delete_recursively(&root).unwrap();
        assert!(!root.exists());
        assert!(temp.path().exists());
    }

    #[test]
    fn test_deletes_single_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "data").unwrap();

        delete_recursively(&file).unwrap();
        assert!(!file.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_does_not_follow_symlinks() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("outside");
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("keep.txt"), "keep").unwrap();

        let root = temp.path().join("tree");
        fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

        delete_recursively(&root).unwrap();
        assert!(!root.exists());
        assert!(outside.join("keep.txt").exists());
    }
}
