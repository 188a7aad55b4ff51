//! Single-stream compression layers.
//!
//! A compressed file wraps exactly one payload. The payload's name is the
//! compressed file's name with the outermost extension removed; if that name
//! still has an extension the payload is treated as another layer.
//!
//! Concatenated gzip, bzip2 and xz members decode as one payload. Bytes after
//! the last member that do not start a new member (tape padding, appended
//! signatures) are ignored, as `gzip -d` does.
//!
//! # Supported Codecs
//!
//! - **Gzip** (.gz, .tgz)
//! - **Bzip2** (.bz2, .tbz2)
//! - **Xz** (.xz, .txz)
//! - **Zstd** (.zst, .tzst)

use std::fs;
use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use tracing::debug;
use xz2::stream::Action;
use xz2::stream::Status;
use xz2::stream::Stream;

use crate::ExtractConfig;
use crate::ExtractionError;
use crate::ExtractionReport;
use crate::Result;
use crate::api::extract_layer;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;
use crate::extension::extension;
use crate::extension::strip_extension;
use crate::formats::detect::BZIP2_MAGIC;
use crate::formats::detect::GZIP_MAGIC;
use crate::formats::detect::XZ_MAGIC;
use crate::formats::detect::ZSTD_MAGIC;
use crate::formats::detect::detect_compression;
use crate::formats::detect::read_signature;
use crate::fs::relocate_file;

/// Compression codec of a single-stream compressed file.
///
/// # Examples
///
/// ```
/// use boost_fetch_core::formats::compression::CompressionCodec;
///
/// assert_eq!(CompressionCodec::Gzip.name(), "gzip");
/// assert_eq!(CompressionCodec::Zstd.extension(), "zst");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionCodec {
    /// Gzip compression (deflate algorithm).
    Gzip,

    /// Bzip2 compression (Burrows-Wheeler algorithm).
    Bzip2,

    /// Xz compression (LZMA2 algorithm).
    Xz,

    /// Zstd compression (Zstandard algorithm).
    Zstd,
}

impl CompressionCodec {
    /// Returns the usual file extension for this codec.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
            Self::Zstd => "zst",
        }
    }

    /// Returns a human-readable name for this codec.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }

    /// Leading bytes of every member of this codec.
    const fn magic(self) -> &'static [u8] {
        match self {
            Self::Gzip => GZIP_MAGIC,
            Self::Bzip2 => BZIP2_MAGIC,
            Self::Xz => XZ_MAGIC,
            Self::Zstd => ZSTD_MAGIC,
        }
    }

    /// Wraps `reader` in a streaming decoder.
    ///
    /// Concatenated members (multi-stream gzip, bzip2 and xz) are decoded as
    /// one continuous payload. Decoding stops at the first trailing byte that
    /// does not begin another member.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder cannot be initialized.
    pub fn decoder<'a, R: Read + 'a>(self, reader: R) -> io::Result<Box<dyn Read + 'a>> {
        let reader = BufReader::new(reader);
        Ok(match self {
            Self::Gzip => Box::new(Members::new(
                reader,
                self.magic(),
                |r| Ok(flate2::bufread::GzDecoder::new(r)),
                flate2::bufread::GzDecoder::into_inner,
            )?),
            Self::Bzip2 => Box::new(Members::new(
                reader,
                self.magic(),
                |r| Ok(bzip2::bufread::BzDecoder::new(r)),
                bzip2::bufread::BzDecoder::into_inner,
            )?),
            Self::Xz => Box::new(Members::new(
                reader,
                self.magic(),
                XzMember::new,
                XzMember::into_inner,
            )?),
            Self::Zstd => Box::new(zstd::stream::read::Decoder::with_buffer(reader)?),
        })
    }
}

/// Decodes consecutive single-member decoders over one buffered reader.
struct Members<R, D> {
    current: Option<D>,
    magic: &'static [u8],
    open: fn(R) -> io::Result<D>,
    into_inner: fn(D) -> R,
}

impl<R: BufRead, D: Read> Members<R, D> {
    fn new(
        reader: R,
        magic: &'static [u8],
        open: fn(R) -> io::Result<D>,
        into_inner: fn(D) -> R,
    ) -> io::Result<Self> {
        Ok(Self {
            current: Some(open(reader)?),
            magic,
            open,
            into_inner,
        })
    }
}

impl<R: BufRead, D: Read> Read for Members<R, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let read = match self.current.as_mut() {
                Some(member) => member.read(buf)?,
                None => return Ok(0),
            };
            if read > 0 || buf.is_empty() {
                return Ok(read);
            }
            let Some(finished) = self.current.take() else {
                return Ok(0);
            };
            let mut reader = (self.into_inner)(finished);
            if starts_member(&mut reader, self.magic)? {
                self.current = Some((self.open)(reader)?);
            }
        }
    }
}

// A short buffer only has to agree with the start of the magic.
fn starts_member<R: BufRead>(reader: &mut R, magic: &[u8]) -> io::Result<bool> {
    let head = reader.fill_buf()?;
    let len = head.len().min(magic.len());
    Ok(len > 0 && head[..len] == magic[..len])
}

/// One xz stream. Unlike `xz2::bufread::XzDecoder`, reading past the end of
/// the stream returns `Ok(0)` and leaves the rest of the input unconsumed.
struct XzMember<R> {
    reader: R,
    stream: Stream,
    finished: bool,
}

impl<R: BufRead> XzMember<R> {
    fn new(reader: R) -> io::Result<Self> {
        Ok(Self {
            reader,
            stream: Stream::new_stream_decoder(u64::MAX, 0)?,
            finished: false,
        })
    }

    fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> Read for XzMember<R> {
    #[allow(clippy::cast_possible_truncation)]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.finished {
                return Ok(0);
            }
            let (read, consumed, eof, status);
            {
                let input = self.reader.fill_buf()?;
                eof = input.is_empty();
                let before_in = self.stream.total_in();
                let before_out = self.stream.total_out();
                let action = if eof { Action::Finish } else { Action::Run };
                status = self.stream.process(input, buf, action);
                consumed = (self.stream.total_in() - before_in) as usize;
                read = (self.stream.total_out() - before_out) as usize;
            }
            self.reader.consume(consumed);

            if status? == Status::StreamEnd {
                self.finished = true;
            }
            if read > 0 || self.finished || buf.is_empty() {
                return Ok(read);
            }
            if eof {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "xz stream truncated"));
            }
            if consumed == 0 {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "corrupt xz stream"));
            }
        }
    }
}

/// Name of the payload inside a compressed file.
///
/// Combined short forms (`.tgz`, `.tbz2`, `.txz`, `.tzst`) expand to a
/// `.tar` payload so the archive layer is still recognized.
///
/// # Errors
///
/// Returns [`ExtractionError::InvalidArgument`] for an empty name.
pub fn payload_name(filename: &str) -> Result<String> {
    let stem = strip_extension(filename)?;
    let outer = extension(filename)?.trim_start_matches('.');
    let expands_to_tar = ["tgz", "taz", "tbz", "tbz2", "txz", "tzst"]
        .iter()
        .any(|short| outer.eq_ignore_ascii_case(short));
    if expands_to_tar {
        Ok(format!("{stem}.tar"))
    } else {
        Ok(stem.to_string())
    }
}

/// Decompresses `source` into `target`.
///
/// When the payload name still carries an extension, the payload is written
/// to a temporary intermediate file and extracted recursively; the
/// intermediate is deleted afterwards. Otherwise the payload is placed at
/// `target/<payload name>`.
///
/// # Errors
///
/// Returns [`ExtractionError::NotCompressed`] if `source` does not start with
/// a known compression signature. Any failure in a nested layer propagates.
pub fn extract_compressor(
    source: &Path,
    target: &Path,
    config: &ExtractConfig,
    depth: usize,
) -> Result<ExtractionReport> {
    let signature = read_signature(source)?;
    let codec = detect_compression(&signature).ok_or_else(|| ExtractionError::NotCompressed {
        path: source.to_path_buf(),
    })?;

    let filename = source
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            ExtractionError::invalid_argument("source", "path has no UTF-8 file name")
        })?;
    let payload = payload_name(filename)?;
    let nested = !extension(&payload)?.is_empty();

    debug!(
        source = %source.display(),
        codec = codec.name(),
        payload = %payload,
        nested,
        "decompressing"
    );

    let mut report = ExtractionReport::new();
    report.layers.push(codec.name());

    let scratch = config.staging_tempdir()?;
    let intermediate = scratch.path().join(&payload);
    let written = {
        let mut decoder = codec.decoder(BufReader::new(File::open(source)?))?;
        let mut writer = BufWriter::with_capacity(64 * 1024, File::create(&intermediate)?);
        let written = copy_with_buffer(&mut decoder, &mut writer, &mut CopyBuffer::new())?;
        writer.flush()?;
        written
    };

    if nested {
        let inner = extract_layer(&intermediate, target, config, depth + 1)?;
        report.merge(inner);
    } else {
        fs::create_dir_all(target)?;
        relocate_file(&intermediate, &target.join(&payload))?;
        report.files_extracted += 1;
        report.bytes_written += written;
    }

    scratch.close()?;
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils;
    use tempfile::TempDir;

    #[test]
    fn test_codec_name() {
        assert_eq!(CompressionCodec::Gzip.name(), "gzip");
        assert_eq!(CompressionCodec::Bzip2.name(), "bzip2");
        assert_eq!(CompressionCodec::Xz.name(), "xz");
        assert_eq!(CompressionCodec::Zstd.name(), "zstd");
    }

    #[test]
    fn test_payload_name() {
        assert_eq!(payload_name("boost_1_70_0.tar.gz").unwrap(), "boost_1_70_0.tar");
        assert_eq!(payload_name("boost_1_70_0.tgz").unwrap(), "boost_1_70_0.tar");
        assert_eq!(payload_name("notes.txt.bz2").unwrap(), "notes.txt");
        assert_eq!(payload_name("README.gz").unwrap(), "README");
        assert_eq!(payload_name("blob").unwrap(), "blob");
    }

    #[test]
    fn test_decoders_round_trip() {
        let payload = b"the quick brown fox".repeat(50);
        let cases = [
            (CompressionCodec::Gzip, test_utils::gzip(&payload)),
            (CompressionCodec::Bzip2, test_utils::bzip2(&payload)),
            (CompressionCodec::Xz, test_utils::xz(&payload)),
            (CompressionCodec::Zstd, test_utils::zstd(&payload)),
        ];
        for (codec, compressed) in cases {
            let mut decoded = Vec::new();
            codec
                .decoder(compressed.as_slice())
                .unwrap()
                .read_to_end(&mut decoded)
                .unwrap();
            assert_eq!(decoded, payload, "codec {}", codec.name());
        }
    }

    fn decode(codec: CompressionCodec, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut decoded = Vec::new();
        codec.decoder(data)?.read_to_end(&mut decoded)?;
        Ok(decoded)
    }

    #[test]
    fn test_concatenated_members_decode_as_one() {
        let cases: [(CompressionCodec, fn(&[u8]) -> Vec<u8>); 3] = [
            (CompressionCodec::Gzip, test_utils::gzip),
            (CompressionCodec::Bzip2, test_utils::bzip2),
            (CompressionCodec::Xz, test_utils::xz),
        ];
        for (codec, compress) in cases {
            let mut data = compress(b"first half, ");
            data.extend(compress(b"second half"));
            assert_eq!(
                decode(codec, &data).unwrap(),
                b"first half, second half",
                "codec {}",
                codec.name()
            );
        }
    }

    #[test]
    fn test_trailing_padding_ignored() {
        let payload = b"payload followed by tape padding".repeat(20);
        let cases = [
            (CompressionCodec::Gzip, test_utils::gzip(&payload)),
            (CompressionCodec::Bzip2, test_utils::bzip2(&payload)),
            (CompressionCodec::Xz, test_utils::xz(&payload)),
        ];
        for (codec, mut data) in cases {
            data.extend_from_slice(&[0u8; 512]);
            assert_eq!(decode(codec, &data).unwrap(), payload, "codec {}", codec.name());
        }
    }

    #[test]
    fn test_broken_second_member_fails() {
        let mut data = test_utils::gzip(b"ok");
        data.extend_from_slice(&[0x1F, 0x8B, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(decode(CompressionCodec::Gzip, &data).is_err());
    }

    #[test]
    fn test_single_file_payload_placed_in_target() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("README.gz");
        fs::write(&source, test_utils::gzip(b"read me")).unwrap();
        let target = temp.path().join("out");

        let report = extract_compressor(&source, &target, &ExtractConfig::default(), 0).unwrap();

        assert_eq!(fs::read(target.join("README")).unwrap(), b"read me");
        assert_eq!(report.files_extracted, 1);
        assert_eq!(report.bytes_written, 7);
        assert_eq!(report.layers, vec!["gzip"]);
    }

    #[test]
    fn test_not_compressed() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("plain.tar");
        fs::write(&source, test_utils::create_test_tar(vec![("a", b"a")])).unwrap();

        let err = extract_compressor(&source, temp.path(), &ExtractConfig::default(), 0)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::NotCompressed { .. }));
    }

    #[test]
    fn test_intermediate_file_removed() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("staging");
        let config = ExtractConfig::default().with_staging_dir(&staging);
        let source = temp.path().join("pkg.tar.gz");
        fs::write(
            &source,
            test_utils::gzip(&test_utils::create_test_tar(vec![("pkg/a.txt", b"a")])),
        )
        .unwrap();

        extract_compressor(&source, &temp.path().join("out"), &config, 0).unwrap();

        assert_eq!(fs::read_dir(&staging).unwrap().count(), 0);
    }
}
