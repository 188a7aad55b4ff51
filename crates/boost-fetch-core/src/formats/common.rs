//! Entry materialization shared between archive formats.
//!
//! Every format handler resolves its entries into a [`StagingWriter`], which
//! owns the staging root, the copy buffer and the running report.

use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use tracing::trace;
use tracing::warn;

use crate::ExtractionError;
use crate::ExtractionReport;
use crate::Result;
use crate::config::PermissionPolicy;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;
use crate::copy::skip_exact;
use crate::fs::clean::remove_file_if_exists;
use crate::permissions::PermissionSet;

/// Writes archive entries below a staging root.
pub(crate) struct StagingWriter<'a> {
    root: &'a Path,
    policy: PermissionPolicy,
    buffer: CopyBuffer,
    report: ExtractionReport,
    directory_modes: Vec<(PathBuf, PermissionSet)>,
}

/// Result of writing all entries: the counters plus directory modes that
/// still have to be applied once the tree reaches its final location.
pub(crate) struct StagedTree {
    pub report: ExtractionReport,
    pub directory_modes: Vec<(PathBuf, PermissionSet)>,
}

impl<'a> StagingWriter<'a> {
    pub fn new(root: &'a Path, policy: PermissionPolicy) -> Self {
        Self {
            root,
            policy,
            buffer: CopyBuffer::new(),
            report: ExtractionReport::new(),
            directory_modes: Vec::new(),
        }
    }

    /// Creates a directory entry.
    ///
    /// The mode is recorded and applied after extraction so that a read-only
    /// directory does not block its own children. An entry naming the root
    /// itself (`./`) is dropped without counting as a skip.
    pub fn create_directory(&mut self, name: &Path, mode: Option<PermissionSet>) -> Result<()> {
        if names_root(name) {
            trace!(path = %name.display(), "ignored root directory entry");
            return Ok(());
        }
        let Some(relative) = sanitize(name) else {
            self.warn_skipped(name, "path escapes the extraction root", 0);
            return Ok(());
        };
        fs::create_dir_all(self.root.join(&relative))?;
        trace!(path = %relative.display(), "created directory");
        self.report.directories_created += 1;
        if let Some(mode) = mode.filter(|_| self.policy.preserves()) {
            self.directory_modes.push((relative, mode));
        }
        Ok(())
    }

    /// Writes a regular file entry, streaming its data from `reader`.
    ///
    /// Missing parent directories are created with default permissions. On
    /// Unix the mode is passed to `open(2)` when the file is created and then
    /// reapplied on the open handle, so the process umask cannot narrow it.
    pub fn write_file<R: Read + ?Sized>(
        &mut self,
        name: &Path,
        reader: &mut R,
        size: u64,
        mode: Option<PermissionSet>,
    ) -> Result<()> {
        let Some(relative) = sanitize(name) else {
            return self.skip(name, reader, size, "path escapes the extraction root");
        };
        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Duplicate entries replace earlier ones.
        remove_file_if_exists(&path)?;

        let mode = mode.filter(|_| self.policy.preserves());
        let mut writer = BufWriter::with_capacity(64 * 1024, create_file(&path, mode)?);
        let written = copy_with_buffer(reader, &mut writer, &mut self.buffer)?;
        writer.flush()?;
        if written != size {
            return Err(ExtractionError::InvalidArchive(format!(
                "entry '{}' truncated: {written} of {size} bytes",
                relative.display()
            )));
        }

        trace!(path = %relative.display(), bytes = written, "extracted file");
        self.report.files_extracted += 1;
        self.report.bytes_written += written;
        Ok(())
    }

    /// Creates a symbolic link entry.
    ///
    /// Links whose target would resolve outside the staging root are skipped.
    /// Platforms without Unix symlinks skip every link with a warning.
    pub fn create_symlink(&mut self, name: &Path, link_target: &Path) -> Result<()> {
        let Some(relative) = sanitize(name) else {
            self.warn_skipped(name, "path escapes the extraction root", 0);
            return Ok(());
        };
        if !link_stays_inside(&relative, link_target) {
            self.warn_skipped(name, "symlink target escapes the extraction root", 0);
            return Ok(());
        }
        self.symlink(&relative, link_target, name)
    }

    #[cfg(unix)]
    fn symlink(&mut self, relative: &Path, link_target: &Path, _name: &Path) -> Result<()> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        remove_file_if_exists(&path)?;
        std::os::unix::fs::symlink(link_target, &path)?;
        self.report.symlinks_created += 1;
        Ok(())
    }

    #[cfg(not(unix))]
    fn symlink(&mut self, _relative: &Path, _link_target: &Path, name: &Path) -> Result<()> {
        self.warn_skipped(name, "symlinks are not supported on this platform", 0);
        Ok(())
    }

    /// Steps over an entry that cannot be materialized, consuming exactly
    /// `size` bytes so the stream stays aligned with the next entry.
    pub fn skip<R: Read + ?Sized>(
        &mut self,
        name: &Path,
        reader: &mut R,
        size: u64,
        reason: &str,
    ) -> Result<()> {
        let consumed = skip_exact(reader, size, &mut self.buffer)?;
        self.warn_skipped(name, reason, consumed);
        Ok(())
    }

    /// Records an entry that was skipped without consuming stream data.
    pub fn warn_skipped(&mut self, name: &Path, reason: &str, consumed: u64) {
        warn!(entry = %name.display(), reason, "skipping archive entry");
        self.report
            .add_warning(format!("skipped '{}': {reason}", name.display()));
        self.report.record_skip(consumed);
    }

    pub fn finish(self) -> StagedTree {
        StagedTree {
            report: self.report,
            directory_modes: self.directory_modes,
        }
    }
}

#[cfg(unix)]
fn create_file(path: &Path, mode: Option<PermissionSet>) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    if let Some(mode) = mode {
        options.mode(mode.mode());
    }
    let file = options.open(path)?;
    // The process umask narrows the creation mode.
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(mode.mode()))?;
    }
    Ok(file)
}

#[cfg(not(unix))]
fn create_file(path: &Path, _mode: Option<PermissionSet>) -> std::io::Result<File> {
    fs::OpenOptions::new().write(true).create_new(true).open(path)
}

/// Applies recorded directory modes below `root`, deepest first.
pub(crate) fn apply_directory_modes(
    root: &Path,
    mut modes: Vec<(PathBuf, PermissionSet)>,
) -> Result<()> {
    modes.sort_by_key(|(path, _)| std::cmp::Reverse(path.components().count()));
    for (relative, mode) in modes {
        set_mode(&root.join(relative), mode)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: PermissionSet) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode.mode()))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: PermissionSet) -> Result<()> {
    Ok(())
}

/// Converts an archive entry name into a relative path below the root.
///
/// Returns `None` for absolute paths, parent references, and names that
/// resolve to the root itself.
pub(crate) fn sanitize(name: &Path) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in name.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative)
    }
}

fn names_root(name: &Path) -> bool {
    name.components().all(|c| c == Component::CurDir)
}

// Resolves the link target lexically against the link's parent directory.
fn link_stays_inside(link: &Path, target: &Path) -> bool {
    let mut depth = link.components().count().saturating_sub(1);
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize(Path::new("a/./b")), Some(PathBuf::from("a/b")));
        assert_eq!(sanitize(Path::new("./")), None);
        assert_eq!(sanitize(Path::new("../evil")), None);
        assert_eq!(sanitize(Path::new("a/../../evil")), None);
        assert_eq!(sanitize(Path::new("/etc/passwd")), None);
    }

    #[test]
    fn test_link_stays_inside() {
        assert!(link_stays_inside(Path::new("lib/libfoo.so"), Path::new("libfoo.so.1")));
        assert!(link_stays_inside(Path::new("a/b/link"), Path::new("../c")));
        assert!(!link_stays_inside(Path::new("link"), Path::new("../outside")));
        assert!(!link_stays_inside(Path::new("link"), Path::new("/etc")));
    }

    #[test]
    fn test_write_file_creates_parents() {
        let temp = TempDir::new().unwrap();
        let mut writer = StagingWriter::new(temp.path(), PermissionPolicy::Preserve);
        let mut data = Cursor::new(b"hello".to_vec());
        writer
            .write_file(Path::new("a/b/c.txt"), &mut data, 5, None)
            .unwrap();

        let staged = writer.finish();
        assert_eq!(staged.report.files_extracted, 1);
        assert_eq!(staged.report.bytes_written, 5);
        assert_eq!(fs::read(temp.path().join("a/b/c.txt")).unwrap(), b"hello");
    }

    #[test]
    fn test_duplicate_entry_replaces_file() {
        let temp = TempDir::new().unwrap();
        let mut writer = StagingWriter::new(temp.path(), PermissionPolicy::Preserve);
        writer
            .write_file(Path::new("f"), &mut Cursor::new(b"first".to_vec()), 5, None)
            .unwrap();
        writer
            .write_file(Path::new("f"), &mut Cursor::new(b"2nd".to_vec()), 3, None)
            .unwrap();
        assert_eq!(fs::read(temp.path().join("f")).unwrap(), b"2nd");
    }

    #[test]
    fn test_skip_consumes_declared_size() {
        let temp = TempDir::new().unwrap();
        let mut writer = StagingWriter::new(temp.path(), PermissionPolicy::Preserve);
        let mut data = Cursor::new(vec![7u8; 100]);
        writer
            .skip(Path::new("dev/fifo"), &mut data, 60, "unsupported")
            .unwrap();

        assert_eq!(data.position(), 60);
        let staged = writer.finish();
        assert_eq!(staged.report.entries_skipped, 1);
        assert_eq!(staged.report.bytes_skipped, 60);
        assert_eq!(staged.report.warnings.len(), 1);
    }

    #[test]
    fn test_escaping_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let mut writer = StagingWriter::new(temp.path(), PermissionPolicy::Preserve);
        let mut data = Cursor::new(b"evil".to_vec());
        writer
            .write_file(Path::new("../evil.txt"), &mut data, 4, None)
            .unwrap();

        let staged = writer.finish();
        assert_eq!(staged.report.files_extracted, 0);
        assert_eq!(staged.report.bytes_skipped, 4);
        assert!(!temp.path().parent().unwrap().join("evil.txt").exists());
    }

    #[test]
    fn test_root_directory_entry_is_not_a_skip() {
        let temp = TempDir::new().unwrap();
        let mut writer = StagingWriter::new(temp.path(), PermissionPolicy::Preserve);
        writer.create_directory(Path::new("./"), None).unwrap();
        writer.create_directory(Path::new("."), None).unwrap();

        let staged = writer.finish();
        assert_eq!(staged.report.entries_skipped, 0);
        assert_eq!(staged.report.directories_created, 0);
        assert!(staged.report.warnings.is_empty());
        assert!(staged.directory_modes.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_mode_applied_at_creation() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let mut writer = StagingWriter::new(temp.path(), PermissionPolicy::Preserve);
        writer
            .write_file(
                Path::new("bootstrap.sh"),
                &mut Cursor::new(b"#!/bin/sh".to_vec()),
                9,
                Some(PermissionSet::from_mode(0o755)),
            )
            .unwrap();
        let mode = fs::metadata(temp.path().join("bootstrap.sh"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_mode_not_narrowed_by_umask() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let mut writer = StagingWriter::new(temp.path(), PermissionPolicy::Preserve);
        writer
            .write_file(
                Path::new("shared.txt"),
                &mut Cursor::new(b"x".to_vec()),
                1,
                Some(PermissionSet::from_mode(0o666)),
            )
            .unwrap();
        let mode = fs::metadata(temp.path().join("shared.txt"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o666);
    }

    #[cfg(unix)]
    #[test]
    fn test_platform_default_ignores_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let mut writer = StagingWriter::new(temp.path(), PermissionPolicy::PlatformDefault);
        writer
            .write_file(
                Path::new("tool"),
                &mut Cursor::new(Vec::new()),
                0,
                Some(PermissionSet::from_mode(0o700)),
            )
            .unwrap();
        writer
            .create_directory(Path::new("ro"), Some(PermissionSet::from_mode(0o500)))
            .unwrap();
        let staged = writer.finish();
        assert!(staged.directory_modes.is_empty());
        let mode = fs::metadata(temp.path().join("tool")).unwrap().permissions().mode();
        assert_ne!(mode & 0o777, 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_modes_applied_deepest_first() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let mut writer = StagingWriter::new(temp.path(), PermissionPolicy::Preserve);
        writer
            .create_directory(Path::new("top"), Some(PermissionSet::from_mode(0o555)))
            .unwrap();
        writer
            .create_directory(Path::new("top/inner"), Some(PermissionSet::from_mode(0o700)))
            .unwrap();
        writer
            .write_file(Path::new("top/inner/f"), &mut Cursor::new(b"x".to_vec()), 1, None)
            .unwrap();
        let staged = writer.finish();
        apply_directory_modes(temp.path(), staged.directory_modes).unwrap();

        let top = fs::metadata(temp.path().join("top")).unwrap().permissions().mode();
        let inner = fs::metadata(temp.path().join("top/inner")).unwrap().permissions().mode();
        assert_eq!(top & 0o777, 0o555);
        assert_eq!(inner & 0o777, 0o700);

        // let TempDir clean up
        fs::set_permissions(temp.path().join("top"), fs::Permissions::from_mode(0o755)).unwrap();
    }
}
