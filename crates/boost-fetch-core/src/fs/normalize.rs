//! Top-level wrapper directory removal.

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use crate::ExtractionError;
use crate::Result;
use crate::fs::clean::delete_recursively;

/// Strips the single top-level directory from `root`.
///
/// Source distributions usually wrap their payload in one directory
/// (`boost_1_70_0/...`). After normalization the payload sits directly under
/// `root`.
///
/// `root` must contain exactly one entry. A lone regular file is already flat
/// and is left untouched. A lone directory is renamed aside, each of its
/// children is renamed into `root`, and the emptied wrapper is deleted.
///
/// Re-running after an interrupted normalization is not guaranteed to reach
/// the same end state.
///
/// # Errors
///
/// Returns [`ExtractionError::AmbiguousTopLevel`] if `root` has zero or
/// several entries, or an I/O error if a move fails.
///
/// # Examples
///
/// ```no_run
/// use boost_fetch_core::fs::normalize;
/// use std::path::Path;
///
/// // target/boost_1_70_0/bootstrap.sh -> target/bootstrap.sh
/// normalize(Path::new("target"))?;
/// # Ok::<(), boost_fetch_core::ExtractionError>(())
/// ```
pub fn normalize(root: &Path) -> Result<()> {
    let mut children = fs::read_dir(root)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    if children.len() != 1 {
        return Err(ExtractionError::AmbiguousTopLevel {
            root: root.to_path_buf(),
            entries: children.len(),
        });
    }
    let wrapper = children.remove(0);

    if !fs::symlink_metadata(&wrapper)?.is_dir() {
        debug!(entry = %wrapper.display(), "single top-level entry is not a directory");
        return Ok(());
    }

    // The wrapper may contain an entry with its own name (foo/foo/...).
    let parked = unused_sibling(root, wrapper.file_name().unwrap_or_default());
    fs::rename(&wrapper, &parked)?;

    for entry in fs::read_dir(&parked)? {
        let entry = entry?;
        fs::rename(entry.path(), root.join(entry.file_name()))?;
    }

    debug!(wrapper = %wrapper.display(), "stripped top-level directory");
    delete_recursively(&parked)
}

fn unused_sibling(root: &Path, name: &std::ffi::OsStr) -> PathBuf {
    let mut counter = 0u32;
    loop {
        let mut candidate = OsString::from(".");
        candidate.push(name);
        candidate.push(format!(".normalizing-{counter}"));
        let path = root.join(candidate);
        if fs::symlink_metadata(&path).is_err() {
            return path;
        }
        counter += 1;
    }
}
