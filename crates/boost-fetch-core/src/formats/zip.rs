//! ZIP archive format handler.

use std::io::Read;
use std::io::Seek;
use std::path::Path;
use std::path::PathBuf;

use zip::ZipArchive;
use zip::result::ZipError;

use crate::ExtractionError;
use crate::Result;
use crate::formats::common::StagingWriter;
use crate::formats::traits::EntryMode;
use crate::formats::traits::ZipMode;

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

// Symlink entries store the link target as their content.
const MAX_LINK_TARGET: u64 = 4096;

/// Extracts every entry of a ZIP archive into `writer`.
///
/// ZIP is read through its central directory, so entries that cannot be
/// decoded (encryption, unsupported compression methods) are skipped
/// without consuming any stream data.
pub(crate) fn extract_zip<R: Read + Seek>(reader: R, writer: &mut StagingWriter<'_>) -> Result<()> {
    let mut archive = ZipArchive::new(reader)
        .map_err(|e| ExtractionError::InvalidArchive(format!("failed to open ZIP archive: {e}")))?;

    for i in 0..archive.len() {
        let name = archive
            .by_index_raw(i)
            .map_err(|e| ExtractionError::InvalidArchive(format!("failed to read ZIP entry: {e}")))?
            .name()
            .to_string();

        let mut file = match archive.by_index(i) {
            Ok(file) => file,
            Err(ZipError::UnsupportedArchive(reason)) => {
                writer.warn_skipped(Path::new(&name), reason, 0);
                continue;
            }
            Err(e) => {
                return Err(ExtractionError::InvalidArchive(format!(
                    "failed to read ZIP entry '{name}': {e}"
                )));
            }
        };

        let Some(path) = file.enclosed_name() else {
            writer.warn_skipped(Path::new(&name), "path escapes the extraction root", 0);
            continue;
        };
        let unix_mode = file.unix_mode();
        let mode = ZipMode(unix_mode).permissions();
        let size = file.size();

        if file.is_dir() {
            writer.create_directory(&path, mode)?;
        } else if unix_mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
            let mut target = String::new();
            (&mut file).take(MAX_LINK_TARGET).read_to_string(&mut target)?;
            writer.create_symlink(&path, &PathBuf::from(target))?;
        } else {
            writer.write_file(&path, &mut file, size, mode)?;
        }
    }
    Ok(())
}
