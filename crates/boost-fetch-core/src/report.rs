//! Extraction operation reporting.

use std::time::Duration;

/// Report of an extraction run.
///
/// Nested layers (a tar inside a gzip stream) merge their statistics into
/// the report of the outermost call.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Number of files successfully extracted.
    pub files_extracted: usize,

    /// Number of directories created from archive entries.
    pub directories_created: usize,

    /// Number of symlinks created.
    pub symlinks_created: usize,

    /// Total bytes written to disk.
    pub bytes_written: u64,

    /// Number of entries skipped because they could not be decoded.
    pub entries_skipped: usize,

    /// Bytes consumed from the stream while skipping entries.
    pub bytes_skipped: u64,

    /// Layers peeled, outermost first (e.g. `["gzip", "tar"]`).
    pub layers: Vec<&'static str>,

    /// Duration of the extraction operation.
    pub duration: Duration,

    /// Warnings generated during extraction.
    pub warnings: Vec<String>,
}

impl ExtractionReport {
    /// Creates a new empty extraction report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Records a skipped entry and the bytes consumed to get past it.
    pub fn record_skip(&mut self, consumed: u64) {
        self.entries_skipped += 1;
        self.bytes_skipped += consumed;
    }

    /// Folds the report of a nested layer into this one.
    ///
    /// Durations are not summed; the outermost call measures its own.
    pub fn merge(&mut self, inner: Self) {
        self.files_extracted += inner.files_extracted;
        self.directories_created += inner.directories_created;
        self.symlinks_created += inner.symlinks_created;
        self.bytes_written += inner.bytes_written;
        self.entries_skipped += inner.entries_skipped;
        self.bytes_skipped += inner.bytes_skipped;
        self.layers.extend(inner.layers);
        self.warnings.extend(inner.warnings);
    }

    /// Returns total number of items written.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.files_extracted + self.directories_created + self.symlinks_created
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
