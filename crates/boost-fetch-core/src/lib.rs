//! Download, extract and normalize Boost source distributions.
//!
//! `boost-fetch-core` caches release archives on disk, peels any number of
//! nested compression and archive layers (gzip, bzip2, xz and zstd over tar,
//! zip or ar), keeps POSIX permissions where the platform has them, and
//! strips the single top-level directory that source tarballs wrap their
//! payload in.
//!
//! # Examples
//!
//! ```no_run
//! use boost_fetch_core::ExtractConfig;
//! use boost_fetch_core::extract_and_normalize;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExtractConfig::default();
//! let report = extract_and_normalize("boost_1_70_0.tar.gz", "/tmp/boost", &config)?;
//! println!("Extracted {} files through {:?}", report.files_extracted, report.layers);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod copy;
pub mod download;
pub mod error;
pub mod extension;
pub mod formats;
pub mod fs;
pub mod permissions;
pub mod report;
pub mod sources;
pub mod test_utils;

// Re-export main API types
pub use api::extract;
pub use api::extract_and_normalize;
pub use config::DownloadConfig;
pub use config::ExtractConfig;
pub use config::PermissionPolicy;
pub use download::HttpTransport;
pub use download::Transport;
pub use download::download;
pub use error::ExtractionError;
pub use error::Result;
pub use fs::delete_recursively;
pub use fs::normalize;
pub use permissions::PermissionSet;
pub use report::ExtractionReport;
pub use sources::fetch_sources;
