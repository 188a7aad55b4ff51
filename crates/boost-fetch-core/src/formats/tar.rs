//! Tar archive format handler.

use std::borrow::Cow;
use std::io::Read;

use tar::EntryType;

use crate::ExtractionError;
use crate::Result;
use crate::formats::common::StagingWriter;
use crate::formats::traits::EntryMode;
use crate::formats::traits::TarMode;

/// Streams every entry of a tar archive into `writer`.
///
/// Regular files, contiguous files, directories and symbolic links are
/// materialized. Any other entry type (hard links, devices, FIFOs) is
/// skipped by consuming exactly its declared size.
pub(crate) fn extract_tar<R: Read>(reader: R, writer: &mut StagingWriter<'_>) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|e| ExtractionError::InvalidArchive(format!("failed to read TAR entries: {e}")))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| {
            ExtractionError::InvalidArchive(format!("failed to read TAR entry: {e}"))
        })?;
        let path = entry
            .path()
            .map_err(|e| ExtractionError::InvalidArchive(format!("invalid TAR entry path: {e}")))?
            .into_owned();
        let entry_type = entry.header().entry_type();
        let mode = TarMode::from(entry.header()).permissions();
        let size = entry.size();

        match entry_type {
            EntryType::Directory => writer.create_directory(&path, mode)?,
            EntryType::Regular | EntryType::Continuous => {
                writer.write_file(&path, &mut entry, size, mode)?;
            }
            EntryType::Symlink => {
                let target = entry.link_name().ok().flatten().map(Cow::into_owned);
                match target {
                    Some(target) => writer.create_symlink(&path, &target)?,
                    None => writer.skip(&path, &mut entry, size, "symlink without a target")?,
                }
            }
            other => {
                let reason = format!("unsupported entry type {other:?}");
                writer.skip(&path, &mut entry, size, &reason)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::PermissionPolicy;
    use crate::test_utils::TarTestBuilder;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn extract(data: &[u8], root: &Path) -> crate::formats::common::StagedTree {
        let mut writer = StagingWriter::new(root, PermissionPolicy::Preserve);
        extract_tar(data, &mut writer).unwrap();
        writer.finish()
    }

    #[test]
    fn test_extract_files_and_directories() {
        let data = TarTestBuilder::new()
            .add_directory("pkg/")
            .add_file("pkg/a.txt", b"alpha")
            .add_file("pkg/sub/b.txt", b"beta")
            .build();
        let temp = TempDir::new().unwrap();

        let staged = extract(&data, temp.path());

        assert_eq!(staged.report.files_extracted, 2);
        assert_eq!(staged.report.directories_created, 1);
        assert_eq!(staged.report.bytes_written, 9);
        assert_eq!(fs::read(temp.path().join("pkg/sub/b.txt")).unwrap(), b"beta");
    }

    #[test]
    fn test_unsupported_entry_is_skipped() {
        let data = TarTestBuilder::new()
            .add_file("before.txt", b"1")
            .add_fifo_with_data("queue", &[0u8; 700])
            .add_file("after.txt", b"2")
            .build();
        let temp = TempDir::new().unwrap();

        let staged = extract(&data, temp.path());

        assert_eq!(staged.report.files_extracted, 2);
        assert_eq!(staged.report.entries_skipped, 1);
        assert_eq!(staged.report.bytes_skipped, 700);
        assert!(!temp.path().join("queue").exists());
        assert_eq!(fs::read(temp.path().join("after.txt")).unwrap(), b"2");
    }

    #[test]
    fn test_dot_prefixed_archive() {
        let data = TarTestBuilder::new()
            .add_raw_path_directory("./")
            .add_raw_path_directory("./boost_1_70_0/")
            .add_raw_path_file("./boost_1_70_0/bootstrap.sh", b"#!/bin/sh\n")
            .build();
        let temp = TempDir::new().unwrap();

        let staged = extract(&data, temp.path());

        assert_eq!(staged.report.entries_skipped, 0);
        assert!(staged.report.warnings.is_empty());
        assert_eq!(staged.report.directories_created, 1);
        assert!(temp.path().join("boost_1_70_0/bootstrap.sh").exists());
    }

    #[test]
    fn test_parent_traversal_is_skipped() {
        let data = TarTestBuilder::new()
            .add_raw_path_file("../escape.txt", b"nope")
            .add_file("ok.txt", b"ok")
            .build();
        let parent = TempDir::new().unwrap();
        let root = parent.path().join("root");
        fs::create_dir(&root).unwrap();

        let staged = extract(&data, &root);

        assert_eq!(staged.report.entries_skipped, 1);
        assert!(!parent.path().join("escape.txt").exists());
        assert!(root.join("ok.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_modes_and_symlinks() {
        use std::os::unix::fs::PermissionsExt;

        let data = TarTestBuilder::new()
            .add_file_with_mode("bootstrap.sh", b"#!/bin/sh\n", 0o755)
            .add_symlink("link.sh", "bootstrap.sh")
            .add_symlink("evil", "../../etc")
            .build();
        let temp = TempDir::new().unwrap();

        let staged = extract(&data, temp.path());

        let mode = fs::metadata(temp.path().join("bootstrap.sh"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(
            fs::read_link(temp.path().join("link.sh")).unwrap(),
            Path::new("bootstrap.sh")
        );
        assert_eq!(staged.report.symlinks_created, 1);
        assert_eq!(staged.report.entries_skipped, 1);
        assert!(fs::symlink_metadata(temp.path().join("evil")).is_err());
    }

    #[test]
    fn test_truncated_archive_fails() {
        let mut data = TarTestBuilder::new().add_file("big.bin", &[1u8; 4096]).build();
        data.truncate(1024);
        let temp = TempDir::new().unwrap();
        let mut writer = StagingWriter::new(temp.path(), PermissionPolicy::Preserve);

        assert!(extract_tar(data.as_slice(), &mut writer).is_err());
    }
}
