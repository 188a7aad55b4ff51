//! Configuration for extraction and downloads.

use std::path::PathBuf;
use std::time::Duration;

/// Whether archive permission bits are applied to extracted entries.
///
/// The policy is resolved once per extraction run and passed down to every
/// format handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionPolicy {
    /// Apply the POSIX mode stored in the archive.
    Preserve,
    /// Ignore archive modes and use the filesystem defaults.
    PlatformDefault,
}

impl PermissionPolicy {
    /// Resolves the policy for the running platform.
    ///
    /// Windows has no POSIX permission bits, so archive modes are ignored
    /// there; every other platform preserves them.
    #[must_use]
    pub fn for_current_platform() -> Self {
        if cfg!(windows) {
            Self::PlatformDefault
        } else {
            Self::Preserve
        }
    }

    /// Returns `true` if archive modes should be applied.
    #[must_use]
    pub const fn preserves(self) -> bool {
        matches!(self, Self::Preserve)
    }
}

impl Default for PermissionPolicy {
    fn default() -> Self {
        Self::for_current_platform()
    }
}

/// Extraction settings.
///
/// # Examples
///
/// ```
/// use boost_fetch_core::ExtractConfig;
/// use boost_fetch_core::config::PermissionPolicy;
///
/// let config = ExtractConfig::default()
///     .with_permissions(PermissionPolicy::PlatformDefault)
///     .with_max_nesting(4);
/// assert_eq!(config.max_nesting, 4);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Permission handling for extracted entries.
    pub permissions: PermissionPolicy,

    /// Directory in which staging and intermediate files are created.
    ///
    /// `None` uses the system temporary directory. Placing it on the same
    /// filesystem as the target lets relocation use plain renames.
    pub staging_dir: Option<PathBuf>,

    /// Maximum number of nested compression/archive layers.
    pub max_nesting: usize,
}

impl Default for ExtractConfig {
    /// Default values:
    /// - `permissions`: [`PermissionPolicy::for_current_platform`]
    /// - `staging_dir`: `None` (system temporary directory)
    /// - `max_nesting`: 8
    fn default() -> Self {
        Self {
            permissions: PermissionPolicy::for_current_platform(),
            staging_dir: None,
            max_nesting: 8,
        }
    }
}

impl ExtractConfig {
    /// Sets the permission policy.
    #[must_use]
    pub fn with_permissions(mut self, permissions: PermissionPolicy) -> Self {
        self.permissions = permissions;
        self
    }

    /// Sets the staging directory.
    #[must_use]
    pub fn with_staging_dir(mut self, staging_dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(staging_dir.into());
        self
    }

    /// Sets the nesting limit.
    #[must_use]
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    pub(crate) fn temp_builder(&self) -> tempfile::Builder<'static, 'static> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("boost-fetch");
        builder
    }

    /// Creates a fresh temporary directory in the configured staging location.
    pub(crate) fn staging_tempdir(&self) -> std::io::Result<tempfile::TempDir> {
        match &self.staging_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                self.temp_builder().tempdir_in(dir)
            }
            None => self.temp_builder().tempdir(),
        }
    }
}

/// HTTP download settings.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Follow HTTP redirects.
    pub follow_redirects: bool,

    /// Whole-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,

    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for DownloadConfig {
    /// Default values:
    /// - `follow_redirects`: false
    /// - `timeout`: `None`
    /// - `user_agent`: `boost-fetch/<version>`
    fn default() -> Self {
        Self {
            follow_redirects: false,
            timeout: None,
            user_agent: concat!("boost-fetch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl DownloadConfig {
    /// Enables or disables redirect following.
    #[must_use]
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
