//! Content-based format detection.
//!
//! Both the compression layer and the archive container are identified from
//! the leading bytes of the file, never from its name.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::compression::CompressionCodec;

/// Number of leading bytes inspected. One tar header block.
pub const SIGNATURE_LEN: usize = 512;

pub(crate) const GZIP_MAGIC: &[u8] = &[0x1F, 0x8B];
pub(crate) const BZIP2_MAGIC: &[u8] = b"BZh";
pub(crate) const XZ_MAGIC: &[u8] = &[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
pub(crate) const ZSTD_MAGIC: &[u8] = &[0x28, 0xB5, 0x2F, 0xFD];

const AR_MAGIC: &[u8] = b"!<arch>\n";
const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_ARCHIVE: &[u8] = b"PK\x05\x06";
const ZIP_SPANNED: &[u8] = b"PK\x07\x08";
const USTAR_MAGIC: &[u8] = b"ustar";
const USTAR_OFFSET: usize = 257;

/// Multi-entry archive containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// POSIX/GNU tar.
    Tar,
    /// ZIP archive.
    Zip,
    /// Unix `ar` archive.
    Ar,
}

impl ArchiveKind {
    /// Returns a human-readable name for this container.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::Zip => "zip",
            Self::Ar => "ar",
        }
    }
}

/// Reads up to [`SIGNATURE_LEN`] leading bytes of `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn read_signature(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut signature = Vec::with_capacity(SIGNATURE_LEN);
    File::open(path)?
        .take(SIGNATURE_LEN as u64)
        .read_to_end(&mut signature)?;
    Ok(signature)
}

/// Identifies a single-stream compression format.
#[must_use]
pub fn detect_compression(signature: &[u8]) -> Option<CompressionCodec> {
    if signature.starts_with(GZIP_MAGIC) {
        Some(CompressionCodec::Gzip)
    } else if signature.starts_with(XZ_MAGIC) {
        Some(CompressionCodec::Xz)
    } else if signature.starts_with(ZSTD_MAGIC) {
        Some(CompressionCodec::Zstd)
    } else if is_bzip2(signature) {
        Some(CompressionCodec::Bzip2)
    } else {
        None
    }
}

/// Identifies a multi-entry archive container.
#[must_use]
pub fn detect_archive(signature: &[u8]) -> Option<ArchiveKind> {
    if signature.starts_with(AR_MAGIC) {
        Some(ArchiveKind::Ar)
    } else if [ZIP_LOCAL_HEADER, ZIP_EMPTY_ARCHIVE, ZIP_SPANNED]
        .iter()
        .any(|magic| signature.starts_with(magic))
    {
        Some(ArchiveKind::Zip)
    } else if is_tar(signature) {
        Some(ArchiveKind::Tar)
    } else {
        None
    }
}

// "BZh" followed by a block size digit 1-9.
fn is_bzip2(signature: &[u8]) -> bool {
    signature.starts_with(BZIP2_MAGIC)
        && signature
            .get(BZIP2_MAGIC.len())
            .is_some_and(|b| (b'1'..=b'9').contains(b))
}

fn is_tar(signature: &[u8]) -> bool {
    if signature.len() < SIGNATURE_LEN {
        return false;
    }
    if signature[USTAR_OFFSET..].starts_with(USTAR_MAGIC) {
        return true;
    }
    // Pre-POSIX (v7) headers carry no magic; accept them when the checksum adds up.
    tar_checksum_matches(&signature[..SIGNATURE_LEN])
}

fn tar_checksum_matches(block: &[u8]) -> bool {
    let field = &block[148..156];
    let text: String = field
        .iter()
        .take_while(|&&b| b != 0 && b != b' ')
        .skip_while(|&&b| b == b' ')
        .map(|&b| char::from(b))
        .collect();
    let Ok(stored) = u32::from_str_radix(text.trim(), 8) else {
        return false;
    };
    let computed: u32 = block
        .iter()
        .enumerate()
        .map(|(i, &b)| if (148..156).contains(&i) { u32::from(b' ') } else { u32::from(b) })
        .sum();
    // An all-zero block sums to 256 (the blank checksum field) and never matches.
    stored == computed
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_detect_gzip() {
        let data = test_utils::gzip(b"hello");
        assert_eq!(detect_compression(&data), Some(CompressionCodec::Gzip));
        assert_eq!(detect_archive(&data), None);
    }

    #[test]
    fn test_detect_other_codecs() {
        assert_eq!(
            detect_compression(&test_utils::bzip2(b"hello")),
            Some(CompressionCodec::Bzip2)
        );
        assert_eq!(
            detect_compression(&test_utils::xz(b"hello")),
            Some(CompressionCodec::Xz)
        );
        assert_eq!(
            detect_compression(&test_utils::zstd(b"hello")),
            Some(CompressionCodec::Zstd)
        );
    }

    #[test]
    fn test_bzip2_needs_block_size() {
        assert_eq!(detect_compression(b"BZhX...."), None);
    }

    #[test]
    fn test_detect_tar() {
        let data = test_utils::create_test_tar(vec![("file.txt", b"hello")]);
        assert_eq!(detect_archive(&data), Some(ArchiveKind::Tar));
        assert_eq!(detect_compression(&data), None);
    }

    #[test]
    fn test_detect_v7_tar() {
        let mut header = tar::Header::new_old();
        header.set_path("old.txt").unwrap();
        header.set_size(0);
        header.set_mode(0o644);
        header.set_cksum();
        let block = header.as_bytes().to_vec();
        assert_eq!(detect_archive(&block), Some(ArchiveKind::Tar));
    }

    #[test]
    fn test_detect_zip() {
        let data = test_utils::create_test_zip(vec![("file.txt", b"hello")]);
        assert_eq!(detect_archive(&data), Some(ArchiveKind::Zip));
    }

    #[test]
    fn test_detect_ar() {
        let data = test_utils::create_test_ar(vec![("member.o", b"obj", 0o644)]);
        assert_eq!(detect_archive(&data), Some(ArchiveKind::Ar));
    }

    #[test]
    fn test_plain_text_is_nothing() {
        let data = vec![b'a'; SIGNATURE_LEN];
        assert_eq!(detect_compression(&data), None);
        assert_eq!(detect_archive(&data), None);
        assert_eq!(detect_archive(&[0u8; SIGNATURE_LEN]), None);
    }

    #[test]
    fn test_read_signature_short_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("short");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(read_signature(&path).unwrap(), b"abc");
    }
}
