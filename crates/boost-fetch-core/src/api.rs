//! High-level public API for extraction.

use std::path::Path;
use std::time::Instant;

use tracing::debug;
use tracing::info;

use crate::ExtractConfig;
use crate::ExtractionError;
use crate::ExtractionReport;
use crate::Result;
use crate::formats::extract_archive;
use crate::formats::extract_compressor;
use crate::fs::normalize;

/// Extracts `source` into `target`, peeling every compression and archive
/// layer.
///
/// The format is detected from content. Compression is tried first; only if
/// the source is not compressed is it read as a tar, zip or ar archive. A
/// compressed payload whose name still carries an extension
/// (`boost.tar.gz` → `boost.tar`) is extracted recursively.
///
/// # Errors
///
/// Returns an error if:
/// - `source` is neither compressed nor a supported archive
///   ([`ExtractionError::UnsupportedFormat`])
/// - layers are nested deeper than `config.max_nesting`
/// - the data is corrupt or an I/O operation fails
///
/// # Examples
///
/// ```no_run
/// use boost_fetch_core::ExtractConfig;
/// use boost_fetch_core::extract;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = extract("boost_1_70_0.tar.gz", "/tmp/boost", &ExtractConfig::default())?;
/// println!("Extracted {} files", report.files_extracted);
/// # Ok(())
/// # }
/// ```
pub fn extract<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    target: Q,
    config: &ExtractConfig,
) -> Result<ExtractionReport> {
    let (source, target) = (source.as_ref(), target.as_ref());
    let start = Instant::now();

    let mut report = extract_layer(source, target, config, 0)?;
    report.duration = start.elapsed();

    info!(
        source = %source.display(),
        target = %target.display(),
        layers = ?report.layers,
        files = report.files_extracted,
        bytes = report.bytes_written,
        "extraction complete"
    );
    Ok(report)
}

/// Extracts `source` into `target`, then strips the single top-level
/// directory from `target`.
///
/// # Errors
///
/// Returns any error from [`extract`] or [`normalize`].
pub fn extract_and_normalize<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    target: Q,
    config: &ExtractConfig,
) -> Result<ExtractionReport> {
    let report = extract(source, target.as_ref(), config)?;
    normalize(target.as_ref())?;
    Ok(report)
}

/// Extracts one layer at nesting level `depth`.
pub(crate) fn extract_layer(
    source: &Path,
    target: &Path,
    config: &ExtractConfig,
    depth: usize,
) -> Result<ExtractionReport> {
    if depth >= config.max_nesting {
        return Err(ExtractionError::NestingTooDeep {
            path: source.to_path_buf(),
            max: config.max_nesting,
        });
    }

    match extract_compressor(source, target, config, depth) {
        Err(ExtractionError::NotCompressed { path }) => {
            debug!(source = %path.display(), "not compressed, trying archive formats");
            extract_archive(source, target, config)
        }
        result => result,
    }
}
