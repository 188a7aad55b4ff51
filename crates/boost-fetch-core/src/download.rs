//! Cached URL downloads.
//!
//! The cache is keyed by file name only: a file already present under the
//! URL's last path segment is returned without touching the network.

use std::fs;
use std::io;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use tracing::debug;
use tracing::info;

use crate::DownloadConfig;
use crate::ExtractionError;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;

/// Source of response bodies.
///
/// [`HttpTransport`] is the network implementation; tests substitute an
/// in-memory one.
pub trait Transport {
    /// Opens `url` and returns its body as a byte stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be fetched.
    fn open(&self, url: &Url) -> Result<Box<dyn Read + '_>>;
}

/// Blocking HTTP(S) transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Http`] if the TLS backend cannot be
    /// initialized.
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let redirect = if config.follow_redirects {
            Policy::default()
        } else {
            Policy::none()
        };
        let client = Client::builder()
            .redirect(redirect)
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &Url) -> Result<Box<dyn Read + '_>> {
        let response = self.client.get(url.clone()).send()?.error_for_status()?;
        let status = response.status();
        if status.is_redirection() {
            // Only reachable with redirects disabled.
            return Err(ExtractionError::Io(io::Error::other(format!(
                "{url} answered with redirect status {status}"
            ))));
        }
        debug!(%url, %status, length = ?response.content_length(), "response received");
        Ok(Box::new(response))
    }
}

/// Returns the cache file name for `url`: its last non-empty path segment.
///
/// # Errors
///
/// Returns [`ExtractionError::InvalidArgument`] if the URL has no usable
/// path segment.
///
/// # Examples
///
/// ```
/// use boost_fetch_core::download::file_name_from_url;
/// use reqwest::Url;
///
/// let url = Url::parse("https://example.org/release/1.70.0/source/boost_1_70_0.tar.gz?x=1")?;
/// assert_eq!(file_name_from_url(&url)?, "boost_1_70_0.tar.gz");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn file_name_from_url(url: &Url) -> Result<&str> {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .filter(|name| !name.contains('\\'))
        .ok_or_else(|| {
            ExtractionError::invalid_argument("url", format!("'{url}' has no file name"))
        })
}

/// Downloads `url` into `destination_dir` and returns the local path.
///
/// If a file with the URL's name already exists it is returned as is and
/// `transport` is not called. Otherwise the body is streamed into a
/// temporary file in `destination_dir`, which is renamed into place once
/// complete, so a failed transfer never leaves a partial file under the
/// final name.
///
/// # Errors
///
/// Returns [`ExtractionError::InvalidArgument`] for a URL without a file
/// name, or an I/O or HTTP error if the transfer fails.
///
/// # Examples
///
/// ```no_run
/// use boost_fetch_core::DownloadConfig;
/// use boost_fetch_core::download::HttpTransport;
/// use boost_fetch_core::download::download;
/// use std::path::Path;
///
/// let transport = HttpTransport::new(&DownloadConfig::default())?;
/// let archive = download(
///     "https://archives.boost.io/release/1.70.0/source/boost_1_70_0.tar.gz",
///     Path::new("cache"),
///     &transport,
/// )?;
/// # Ok::<(), boost_fetch_core::ExtractionError>(())
/// ```
pub fn download<T: Transport + ?Sized>(
    url: &str,
    destination_dir: &Path,
    transport: &T,
) -> Result<PathBuf> {
    let url = Url::parse(url)
        .map_err(|e| ExtractionError::invalid_argument("url", format!("'{url}': {e}")))?;
    let destination = destination_dir.join(file_name_from_url(&url)?);

    if destination.exists() {
        info!(path = %destination.display(), "using cached download");
        return Ok(destination);
    }

    fs::create_dir_all(destination_dir)?;
    info!(%url, path = %destination.display(), "downloading");

    let mut partial = tempfile::Builder::new()
        .prefix(".download")
        .tempfile_in(destination_dir)?;
    let bytes = {
        let mut body = transport.open(&url)?;
        let mut writer = BufWriter::with_capacity(64 * 1024, partial.as_file_mut());
        let bytes = copy_with_buffer(&mut body, &mut writer, &mut CopyBuffer::new())?;
        writer.flush()?;
        bytes
    };
    partial.persist(&destination).map_err(|e| e.error)?;

    debug!(path = %destination.display(), bytes, "download complete");
    Ok(destination)
}
