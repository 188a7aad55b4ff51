//! Error types for download, extraction and normalization.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ExtractionError`.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Errors that can occur while fetching, extracting or normalizing archives.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A required input was empty or malformed.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        name: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The source does not start with a known compression signature.
    ///
    /// The top-level dispatcher treats this as the signal to retry the source
    /// as a multi-entry archive.
    #[error("not a compressed stream: {path}")]
    NotCompressed {
        /// The file that was inspected.
        path: PathBuf,
    },

    /// The source is neither a known compression layer nor a known archive.
    ///
    /// Unlike [`ExtractionError::NotCompressed`] this is fatal and counts as
    /// an I/O failure of the source.
    #[error("unsupported archive format: {path}")]
    UnsupportedFormat {
        /// The file that was inspected.
        path: PathBuf,
    },

    /// Archive is corrupted or invalid.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// Normalization needs exactly one top-level entry.
    #[error("ambiguous top-level content in {root}: expected 1 entry, found {entries}")]
    AmbiguousTopLevel {
        /// The directory being normalized.
        root: PathBuf,
        /// Number of entries found directly under `root`.
        entries: usize,
    },

    /// Compression/archive layers are nested deeper than allowed.
    #[error("archive layers nested too deeply in {path} (limit {max})")]
    NestingTooDeep {
        /// The file at which the limit was hit.
        path: PathBuf,
        /// Configured nesting limit.
        max: usize,
    },
}

impl ExtractionError {
    /// Builds an [`ExtractionError::InvalidArgument`].
    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error reports an unrecognized stream format.
    ///
    /// # Examples
    ///
    /// ```
    /// use boost_fetch_core::ExtractionError;
    /// use std::path::PathBuf;
    ///
    /// let err = ExtractionError::UnsupportedFormat {
    ///     path: PathBuf::from("notes.txt"),
    /// };
    /// assert!(err.is_format_error());
    ///
    /// let err = ExtractionError::InvalidArchive("truncated".to_string());
    /// assert!(!err.is_format_error());
    /// ```
    #[must_use]
    pub const fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::NotCompressed { .. } | Self::UnsupportedFormat { .. }
        )
    }

    /// Returns `true` if this error came from the filesystem, the network or
    /// a source that could not be read as any supported format.
    ///
    /// [`ExtractionError::NotCompressed`] is excluded: it only triggers the
    /// fallback to archive extraction.
    #[must_use]
    pub const fn is_io_error(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Http(_)
                | Self::InvalidArchive(_)
                | Self::UnsupportedFormat { .. }
                | Self::NestingTooDeep { .. }
        )
    }

    /// Returns a context string for this error, if available.
    ///
    /// # Examples
    ///
    /// ```
    /// use boost_fetch_core::ExtractionError;
    ///
    /// let err = ExtractionError::InvalidArchive("bad header".to_string());
    /// assert_eq!(err.context(), Some("bad header"));
    /// ```
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::InvalidArchive(msg) => Some(msg),
            Self::InvalidArgument { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
