//! Boost source distribution workflow.
//!
//! Maps a project version and platform classifier to a release archive,
//! downloads it into a cache directory and unpacks it into a normalized
//! source tree. Extraction is skipped when the tree is already in place.

use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::info;

use crate::ExtractConfig;
use crate::ExtractionError;
use crate::ExtractionReport;
use crate::Result;
use crate::api::extract_and_normalize;
use crate::download::Transport;
use crate::download::download;
use crate::fs::delete_recursively;

/// Release mirror used unless overridden.
pub const DEFAULT_BASE_URL: &str = "https://archives.boost.io/release";

/// File whose presence marks a completed extraction.
pub const DEFAULT_MARKER: &str = "bootstrap.sh";

/// Extracts the Boost version from a project version.
///
/// Project versions append a packaging revision to the Boost version
/// (`1.70.0-1`); the Boost version is everything before the first dash.
///
/// # Errors
///
/// Returns [`ExtractionError::InvalidArgument`] if the version is empty,
/// has no dash, or has nothing before or after the first dash.
///
/// # Examples
///
/// ```
/// use boost_fetch_core::sources::boost_version;
///
/// assert_eq!(boost_version("1.70.0-1")?, "1.70.0");
/// assert!(boost_version("1.70.0").is_err());
/// # Ok::<(), boost_fetch_core::ExtractionError>(())
/// ```
pub fn boost_version(project_version: &str) -> Result<&str> {
    if project_version.is_empty() {
        return Err(ExtractionError::invalid_argument(
            "project_version",
            "may not be empty",
        ));
    }
    match project_version.split_once('-') {
        Some((version, revision)) if !version.is_empty() && !revision.is_empty() => Ok(version),
        _ => Err(ExtractionError::invalid_argument(
            "project_version",
            format!("expected <boost version>-<revision>, got '{project_version}'"),
        )),
    }
}

/// Target platform of a source release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classifier {
    /// Windows; sources ship as `.zip`.
    Windows,
    /// Linux; sources ship as `.tar.gz`.
    Linux,
    /// macOS; sources ship as `.tar.gz`.
    Mac,
}

impl Classifier {
    /// Extension of the source archive for this platform.
    #[must_use]
    pub const fn archive_extension(self) -> &'static str {
        match self {
            Self::Windows => "zip",
            Self::Linux | Self::Mac => "tar.gz",
        }
    }

    /// Returns the classifier string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Mac => "mac",
        }
    }
}

impl FromStr for Classifier {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "mac" => Ok(Self::Mac),
            other => Err(ExtractionError::invalid_argument(
                "classifier",
                format!("unexpected classifier '{other}'"),
            )),
        }
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a source fetch.
///
/// # Examples
///
/// ```
/// use boost_fetch_core::sources::Classifier;
/// use boost_fetch_core::sources::SourceRequest;
///
/// let request = SourceRequest::new("1.70.0-1", Classifier::Linux, "target")?;
/// assert_eq!(
///     request.archive_url(),
///     "https://archives.boost.io/release/1.70.0/source/boost_1_70_0.tar.gz"
/// );
/// assert!(request.target().ends_with("dependency/boost"));
/// # Ok::<(), boost_fetch_core::ExtractionError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SourceRequest {
    version: String,
    classifier: Classifier,
    base_url: String,
    cache_dir: PathBuf,
    target: PathBuf,
    marker: String,
    extract: ExtractConfig,
}

impl SourceRequest {
    /// Creates a request for `project_version` built under `build_dir`.
    ///
    /// The archive is cached directly in `build_dir` and unpacked into
    /// `build_dir/dependency/boost`.
    ///
    /// # Errors
    ///
    /// Returns an error if `project_version` is malformed.
    pub fn new(
        project_version: &str,
        classifier: Classifier,
        build_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let build_dir = build_dir.into();
        Ok(Self {
            version: boost_version(project_version)?.to_string(),
            classifier,
            base_url: DEFAULT_BASE_URL.to_string(),
            target: build_dir.join("dependency").join("boost"),
            cache_dir: build_dir,
            marker: DEFAULT_MARKER.to_string(),
            extract: ExtractConfig::default(),
        })
    }

    /// Sets the release mirror.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the download cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Sets the extraction target.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = target.into();
        self
    }

    /// Sets the marker file checked below the target.
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Sets the extraction configuration.
    #[must_use]
    pub fn with_extract_config(mut self, config: ExtractConfig) -> Self {
        self.extract = config;
        self
    }

    /// The Boost version, e.g. `1.70.0`.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The platform classifier.
    #[must_use]
    pub const fn classifier(&self) -> Classifier {
        self.classifier
    }

    /// The download cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// The extraction target.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// URL of the source archive.
    #[must_use]
    pub fn archive_url(&self) -> String {
        format!(
            "{}/{}/source/boost_{}.{}",
            self.base_url.trim_end_matches('/'),
            self.version,
            self.version.replace('.', "_"),
            self.classifier.archive_extension()
        )
    }
}

/// Result of [`fetch_sources`].
#[derive(Debug)]
pub struct SourcesOutcome {
    /// Cached archive.
    pub archive: PathBuf,
    /// Normalized source tree.
    pub target: PathBuf,
    /// Present when extraction ran.
    pub report: Option<ExtractionReport>,
}

impl SourcesOutcome {
    /// Returns `true` if the archive was extracted by this call.
    #[must_use]
    pub const fn extracted(&self) -> bool {
        self.report.is_some()
    }
}

/// Downloads the source archive and unpacks it unless already unpacked.
///
/// When `target/<marker>` is missing, whatever is at `target` is deleted,
/// the archive is extracted into it and the top-level directory is stripped.
///
/// # Errors
///
/// Returns any download, extraction or normalization error.
///
/// # Examples
///
/// ```no_run
/// use boost_fetch_core::DownloadConfig;
/// use boost_fetch_core::download::HttpTransport;
/// use boost_fetch_core::sources::Classifier;
/// use boost_fetch_core::sources::SourceRequest;
/// use boost_fetch_core::sources::fetch_sources;
///
/// let request = SourceRequest::new("1.70.0-1", Classifier::Linux, "target")?;
/// let transport = HttpTransport::new(&DownloadConfig::default())?;
/// let outcome = fetch_sources(&request, &transport)?;
/// assert!(outcome.target.join("bootstrap.sh").exists());
/// # Ok::<(), boost_fetch_core::ExtractionError>(())
/// ```
pub fn fetch_sources<T: Transport + ?Sized>(
    request: &SourceRequest,
    transport: &T,
) -> Result<SourcesOutcome> {
    let archive = download(&request.archive_url(), &request.cache_dir, transport)?;
    let target = request.target.clone();

    if target.join(&request.marker).exists() {
        info!(target = %target.display(), "sources already extracted");
        return Ok(SourcesOutcome {
            archive,
            target,
            report: None,
        });
    }

    delete_recursively(&target)?;
    info!(archive = %archive.display(), target = %target.display(), "extracting sources");
    let report = extract_and_normalize(&archive, &target, &request.extract)?;

    Ok(SourcesOutcome {
        archive,
        target,
        report: Some(report),
    })
}
