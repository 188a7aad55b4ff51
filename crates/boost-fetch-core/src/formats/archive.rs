//! Multi-entry archive extraction through a staging directory.

use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::debug;

use crate::ExtractConfig;
use crate::ExtractionError;
use crate::ExtractionReport;
use crate::Result;
use crate::formats::ar::extract_ar;
use crate::formats::common::StagingWriter;
use crate::formats::common::apply_directory_modes;
use crate::formats::detect::ArchiveKind;
use crate::formats::detect::detect_archive;
use crate::formats::detect::read_signature;
use crate::formats::tar::extract_tar;
use crate::formats::zip::extract_zip;
use crate::fs::relocate_tree;

/// Extracts a tar, zip or ar archive into `target`.
///
/// Entries are first written to a fresh staging directory in archive order.
/// Only when every entry has been processed is the staged tree moved into
/// `target`; a failure part-way leaves `target` untouched and the staging
/// directory is discarded.
///
/// # Errors
///
/// Returns [`ExtractionError::UnsupportedFormat`] if `source` is not a
/// recognized archive, [`ExtractionError::InvalidArchive`] if it is corrupt,
/// or an I/O error.
pub fn extract_archive(
    source: &Path,
    target: &Path,
    config: &ExtractConfig,
) -> Result<ExtractionReport> {
    let kind = detect_archive(&read_signature(source)?).ok_or_else(|| {
        ExtractionError::UnsupportedFormat {
            path: source.to_path_buf(),
        }
    })?;
    debug!(source = %source.display(), format = kind.name(), "extracting archive");

    let staging = config.staging_tempdir()?;
    // Temporary directories are private; the tree root gets default permissions.
    let root = staging.path().join("tree");
    fs::create_dir(&root)?;
    let mut writer = StagingWriter::new(&root, config.permissions);
    let reader = BufReader::with_capacity(64 * 1024, File::open(source)?);
    match kind {
        ArchiveKind::Tar => extract_tar(reader, &mut writer)?,
        ArchiveKind::Zip => extract_zip(reader, &mut writer)?,
        ArchiveKind::Ar => extract_ar(reader, &mut writer)?,
    }
    let staged = writer.finish();

    relocate_tree(&root, target)?;
    apply_directory_modes(target, staged.directory_modes)?;

    let mut report = staged.report;
    report.layers.push(kind.name());
    debug!(
        target = %target.display(),
        files = report.files_extracted,
        skipped = report.entries_skipped,
        "archive extracted"
    );
    Ok(report)
}
