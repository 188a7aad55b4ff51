//! Test utilities for building in-memory archives and compressed payloads.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::Cursor;
use std::io::Write;

/// Creates an in-memory TAR archive from a list of entries.
///
/// Each entry is a tuple of (path, content). Files are created with mode 0o644.
///
/// # Examples
///
/// ```
/// use boost_fetch_core::test_utils::create_test_tar;
///
/// let tar_data = create_test_tar(vec![("file.txt", b"hello"), ("dir/nested.txt", b"world")]);
/// ```
#[must_use]
pub fn create_test_tar(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    entries
        .into_iter()
        .fold(TarTestBuilder::new(), |builder, (path, data)| builder.add_file(path, data))
        .build()
}

/// Creates an in-memory ZIP archive from a list of entries.
///
/// Each entry is a tuple of (path, content). Files are stored uncompressed
/// with mode 0o644.
#[must_use]
pub fn create_test_zip(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    entries
        .into_iter()
        .fold(ZipTestBuilder::new(), |builder, (path, data)| builder.add_file(path, data))
        .build()
}

/// Creates an in-memory `ar` archive from (name, content, mode) members.
///
/// # Examples
///
/// ```
/// use boost_fetch_core::test_utils::create_test_ar;
///
/// let ar_data = create_test_ar(vec![("debian-binary", b"2.0\n", 0o644)]);
/// assert!(ar_data.starts_with(b"!<arch>\n"));
/// ```
#[must_use]
pub fn create_test_ar(members: Vec<(&str, &[u8], u32)>) -> Vec<u8> {
    let mut builder = ar::Builder::new(Vec::new());
    for (name, data, mode) in members {
        let mut header = ar::Header::new(name.as_bytes().to_vec(), data.len() as u64);
        header.set_mode(mode);
        builder.append(&header, data).unwrap();
    }
    builder.into_inner().unwrap()
}

/// Compresses `data` with gzip.
#[must_use]
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Compresses `data` with bzip2.
#[must_use]
pub fn bzip2(data: &[u8]) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Compresses `data` with xz.
#[must_use]
pub fn xz(data: &[u8]) -> Vec<u8> {
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Compresses `data` with zstd.
#[must_use]
pub fn zstd(data: &[u8]) -> Vec<u8> {
    zstd::stream::encode_all(data, 0).unwrap()
}

/// Builder for creating TAR test archives with various entry types.
///
/// # Examples
///
/// ```
/// use boost_fetch_core::test_utils::TarTestBuilder;
///
/// let tar_data = TarTestBuilder::new()
///     .add_directory("dir/")
///     .add_file_with_mode("dir/run.sh", b"#!/bin/sh\n", 0o755)
///     .add_symlink("link", "dir/run.sh")
///     .build();
/// ```
pub struct TarTestBuilder {
    builder: tar::Builder<Vec<u8>>,
}

impl TarTestBuilder {
    /// Creates a new TAR test builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    /// Adds a regular file to the archive.
    #[must_use]
    pub fn add_file(self, path: &str, data: &[u8]) -> Self {
        self.add_file_with_mode(path, data, 0o644)
    }

    /// Adds a regular file with custom mode.
    #[must_use]
    pub fn add_file_with_mode(mut self, path: &str, data: &[u8], mode: u32) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_cksum();
        self.builder.append_data(&mut header, path, data).unwrap();
        self
    }

    /// Adds a regular file whose name is written verbatim, bypassing the
    /// builder's path validation (e.g. `../escape.txt`).
    #[must_use]
    pub fn add_raw_path_file(self, path: &str, data: &[u8]) -> Self {
        self.append_raw(path, tar::EntryType::Regular, 0o644, data)
    }

    /// Adds a directory whose name is written verbatim, such as the `./`
    /// entry `tar -C dir .` starts with.
    #[must_use]
    pub fn add_raw_path_directory(self, path: &str) -> Self {
        self.append_raw(path, tar::EntryType::Directory, 0o755, &[])
    }

    fn append_raw(mut self, path: &str, kind: tar::EntryType, mode: u32, data: &[u8]) -> Self {
        let mut header = tar::Header::new_gnu();
        let name = &mut header.as_gnu_mut().unwrap().name;
        name[..path.len()].copy_from_slice(path.as_bytes());
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_entry_type(kind);
        header.set_cksum();
        self.builder.append(&header, data).unwrap();
        self
    }

    /// Adds a directory to the archive.
    #[must_use]
    pub fn add_directory(self, path: &str) -> Self {
        self.add_directory_with_mode(path, 0o755)
    }

    /// Adds a directory with custom mode.
    #[must_use]
    pub fn add_directory_with_mode(mut self, path: &str, mode: u32) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(mode);
        header.set_entry_type(tar::EntryType::Directory);
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Adds a symlink to the archive.
    #[must_use]
    pub fn add_symlink(mut self, path: &str, target: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o777);
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_link_name(target).unwrap();
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Adds a FIFO entry that nonetheless declares a data payload.
    ///
    /// Extraction does not support FIFOs, so this exercises the skip path.
    #[must_use]
    pub fn add_fifo_with_data(mut self, path: &str, data: &[u8]) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Fifo);
        header.set_cksum();
        self.builder.append_data(&mut header, path, data).unwrap();
        self
    }

    /// Builds and returns the TAR archive data.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }
}

impl Default for TarTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating ZIP test archives with various entry types.
///
/// # Examples
///
/// ```
/// use boost_fetch_core::test_utils::ZipTestBuilder;
///
/// let zip_data = ZipTestBuilder::new()
///     .add_file("file.txt", b"content")
///     .add_directory("dir/")
///     .build();
/// ```
pub struct ZipTestBuilder {
    zip: zip::ZipWriter<Cursor<Vec<u8>>>,
    method_overrides: Vec<(String, u16)>,
}

impl ZipTestBuilder {
    /// Creates a new ZIP test builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            zip: zip::ZipWriter::new(Cursor::new(Vec::new())),
            method_overrides: Vec::new(),
        }
    }

    /// Adds a regular file to the archive.
    #[must_use]
    pub fn add_file(self, path: &str, data: &[u8]) -> Self {
        self.add_file_with_mode(path, data, 0o644)
    }

    /// Adds a regular file with custom mode.
    #[must_use]
    pub fn add_file_with_mode(mut self, path: &str, data: &[u8], mode: u32) -> Self {
        use zip::write::SimpleFileOptions;

        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(mode);

        self.zip.start_file(path, options).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    /// Adds a directory to the archive.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        use zip::write::SimpleFileOptions;

        let options = SimpleFileOptions::default().unix_permissions(0o755);
        self.zip.add_directory(path, options).unwrap();
        self
    }

    /// Adds a symlink to the archive.
    #[must_use]
    pub fn add_symlink(mut self, path: &str, target: &str) -> Self {
        use zip::write::SimpleFileOptions;

        let options = SimpleFileOptions::default();
        self.zip.add_symlink(path, target, options).unwrap();
        self
    }

    /// Adds a stored file whose headers then claim compression `method`
    /// (e.g. 18, IBM TERSE), so readers without that codec refuse it.
    #[must_use]
    pub fn add_file_with_method_id(mut self, path: &str, data: &[u8], method: u16) -> Self {
        self.method_overrides.push((path.to_string(), method));
        self.add_file(path, data)
    }

    /// Builds and returns the ZIP archive data.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut data = self.zip.finish().unwrap().into_inner();
        for (name, method) in &self.method_overrides {
            set_zip_method(&mut data, name.as_bytes(), *method);
        }
        data
    }
}

// Rewrites the method field of both the local and the central header of `name`.
fn set_zip_method(data: &mut [u8], name: &[u8], method: u16) {
    let read_u16 =
        |data: &[u8], at: usize| usize::from(u16::from_le_bytes([data[at], data[at + 1]]));
    let mut patched = 0;
    for pos in 0..data.len().saturating_sub(46) {
        let (method_at, name_at, name_len) = match &data[pos..pos + 4] {
            b"PK\x03\x04" => (pos + 8, pos + 30, read_u16(data, pos + 26)),
            b"PK\x01\x02" => (pos + 10, pos + 46, read_u16(data, pos + 28)),
            _ => continue,
        };
        if data.get(name_at..name_at + name_len) == Some(name) {
            data[method_at..method_at + 2].copy_from_slice(&method.to_le_bytes());
            patched += 1;
        }
    }
    assert_eq!(patched, 2, "zip headers for {} not found", String::from_utf8_lossy(name));
}

impl Default for ZipTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_tar() {
        let tar_data = create_test_tar(vec![("file.txt", b"hello")]);
        assert_eq!(tar_data.len() % 512, 0);
    }

    #[test]
    fn test_create_test_ar() {
        let ar_data = create_test_ar(vec![("a", b"1", 0o644), ("b", b"22", 0o755)]);
        assert!(ar_data.starts_with(b"!<arch>\n"));
    }

    #[test]
    fn test_compression_helpers_differ() {
        let data = b"payload";
        assert_ne!(gzip(data), data.to_vec());
        assert_ne!(bzip2(data), gzip(data));
        assert_ne!(xz(data), zstd(data));
    }
}
