//! Filename extension resolution.
//!
//! Extensions drive recursion only: after one compression layer has been
//! removed, the remaining extension tells the dispatcher whether another
//! layer is expected. The stream content, not the name, decides the format.

use crate::ExtractionError;
use crate::Result;

/// Returns the trailing extension of `filename`, including the leading dot.
///
/// The extension is the final `.` followed by one or more ASCII alphanumeric
/// characters, and it must be preceded by at least one non-dot character.
/// Hidden files such as `.profile` therefore have no extension. An empty
/// string is returned when there is none.
///
/// # Errors
///
/// Returns [`ExtractionError::InvalidArgument`] if `filename` is empty.
///
/// # Examples
///
/// ```
/// use boost_fetch_core::extension::extension;
///
/// assert_eq!(extension("boost_1_70_0.tar.gz")?, ".gz");
/// assert_eq!(extension(".hidden")?, "");
/// assert_eq!(extension("README")?, "");
/// # Ok::<(), boost_fetch_core::ExtractionError>(())
/// ```
pub fn extension(filename: &str) -> Result<&str> {
    if filename.is_empty() {
        return Err(ExtractionError::invalid_argument(
            "filename",
            "may not be empty",
        ));
    }

    let Some(dot) = filename.rfind('.') else {
        return Ok("");
    };
    let suffix = &filename[dot + 1..];
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Ok("");
    }
    // The dot must follow a non-dot character.
    match filename[..dot].bytes().last() {
        Some(b) if b != b'.' => Ok(&filename[dot..]),
        _ => Ok(""),
    }
}

/// Returns `filename` without its trailing extension.
///
/// # Errors
///
/// Returns [`ExtractionError::InvalidArgument`] if `filename` is empty.
pub fn strip_extension(filename: &str) -> Result<&str> {
    let ext = extension(filename)?;
    Ok(&filename[..filename.len() - ext.len()])
}

/// A filename decomposed into its extensions, outermost first.
///
/// `boost_1_70_0.tar.gz` becomes the stem `boost_1_70_0` with the chain
/// `[".gz", ".tar"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionChain {
    stem: String,
    extensions: Vec<String>,
}

impl ExtensionChain {
    /// Peels every extension off `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::InvalidArgument`] if `filename` is empty.
    pub fn parse(filename: &str) -> Result<Self> {
        let mut extensions = Vec::new();
        let mut rest = filename;
        loop {
            let ext = extension(rest)?;
            if ext.is_empty() {
                break;
            }
            extensions.push(ext.to_string());
            rest = &rest[..rest.len() - ext.len()];
        }
        Ok(Self {
            stem: rest.to_string(),
            extensions,
        })
    }

    /// The filename with every extension removed.
    #[must_use]
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// The outermost extension, if any.
    #[must_use]
    pub fn outer(&self) -> Option<&str> {
        self.extensions.first().map(String::as_str)
    }

    /// Number of extensions in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Returns `true` if the filename has no extension.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Iterates the extensions from outermost to innermost.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_extension() {
        assert_eq!(extension("archive.zip").unwrap(), ".zip");
        assert_eq!(extension("boost_1_70_0.tar.gz").unwrap(), ".gz");
        assert_eq!(extension("boost_1_70_0.tar").unwrap(), ".tar");
    }

    #[test]
    fn test_no_extension() {
        assert_eq!(extension("boost_1_70_0").unwrap(), "");
        assert_eq!(extension("trailing.").unwrap(), "");
        assert_eq!(extension("name.with-dash").unwrap(), "");
    }

    #[test]
    fn test_hidden_files_have_no_extension() {
        assert_eq!(extension(".hidden").unwrap(), "");
        assert_eq!(extension("..hidden").unwrap(), "");
        assert_eq!(extension("a..b").unwrap(), "");
    }

    #[test]
    fn test_hidden_file_with_suffix() {
        assert_eq!(extension(".config.toml").unwrap(), ".toml");
    }

    #[test]
    fn test_empty_filename_rejected() {
        let err = extension("").unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::InvalidArgument {
                name: "filename",
                ..
            }
        ));
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("foo.tar.gz").unwrap(), "foo.tar");
        assert_eq!(strip_extension("foo.tar").unwrap(), "foo");
        assert_eq!(strip_extension("foo").unwrap(), "foo");
    }

    #[test]
    fn test_chain_peeling() {
        let chain = ExtensionChain::parse("boost_1_70_0.tar.gz").unwrap();
        assert_eq!(chain.iter().collect::<Vec<_>>(), vec![".gz", ".tar"]);
        assert_eq!(chain.stem(), "boost_1_70_0");
        assert_eq!(chain.outer(), Some(".gz"));
        assert_eq!(chain.len(), 2);

        let inner = ExtensionChain::parse(chain.stem()).unwrap();
        assert!(inner.is_empty());
        assert_eq!(inner.outer(), None);
    }

    #[test]
    fn test_chain_stops_at_hidden_prefix() {
        let chain = ExtensionChain::parse(".tar.gz").unwrap();
        assert_eq!(chain.iter().collect::<Vec<_>>(), vec![".gz"]);
        assert_eq!(chain.stem(), ".tar");
    }
}
