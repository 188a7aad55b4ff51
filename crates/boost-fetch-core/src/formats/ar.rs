//! Unix `ar` archive format handler.

use std::io::Read;
use std::path::PathBuf;

use crate::ExtractionError;
use crate::Result;
use crate::formats::common::StagingWriter;
use crate::formats::traits::ArMode;
use crate::formats::traits::EntryMode;

/// Streams every member of an `ar` archive into `writer`.
///
/// Members are flat regular files; each one carries a POSIX mode.
pub(crate) fn extract_ar<R: Read>(reader: R, writer: &mut StagingWriter<'_>) -> Result<()> {
    let mut archive = ar::Archive::new(reader);

    while let Some(entry) = archive.next_entry() {
        let mut entry = entry.map_err(|e| {
            ExtractionError::InvalidArchive(format!("failed to read ar member: {e}"))
        })?;
        let header = entry.header();
        let name = PathBuf::from(String::from_utf8_lossy(header.identifier()).into_owned());
        let mode = ArMode::from(header).permissions();
        let size = header.size();

        writer.write_file(&name, &mut entry, size, mode)?;
    }
    Ok(())
}
