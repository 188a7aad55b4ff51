//! Bounded-buffer stream copying.
//!
//! Every byte moved by this crate (HTTP bodies, decompressed layers, archive
//! entries) passes through a fixed 64 KiB [`CopyBuffer`], so peak memory does
//! not depend on archive size.

use std::io::Read;
use std::io::Write;
use std::io::{self};

use crate::ExtractionError;
use crate::Result;

/// Buffer size for I/O operations (64KB).
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Stack-allocated buffer reused across copy operations.
///
/// # Examples
///
/// ```no_run
/// # use boost_fetch_core::copy::{CopyBuffer, copy_with_buffer};
/// # use boost_fetch_core::ExtractionError;
/// # fn example() -> Result<(), ExtractionError> {
/// let mut buffer = CopyBuffer::new();
/// let mut input = std::fs::File::open("input.txt")?;
/// let mut output = std::fs::File::create("output.txt")?;
///
/// let bytes_copied = copy_with_buffer(&mut input, &mut output, &mut buffer)?;
/// println!("Copied {} bytes", bytes_copied);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CopyBuffer {
    #[allow(clippy::large_stack_arrays)]
    buf: [u8; COPY_BUFFER_SIZE],
}

impl CopyBuffer {
    /// Creates a new zero-initialized copy buffer.
    #[inline]
    #[must_use]
    #[allow(clippy::large_stack_arrays)]
    pub fn new() -> Self {
        Self {
            buf: [0u8; COPY_BUFFER_SIZE],
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        COPY_BUFFER_SIZE
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies everything from `reader` to `writer` through `buffer`.
///
/// Interrupted reads are retried. Returns the number of bytes copied.
///
/// # Errors
///
/// Returns an error if reading or writing fails.
#[inline]
pub fn copy_with_buffer<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
) -> Result<u64> {
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ExtractionError::Io(e)),
        };

        writer
            .write_all(&buffer.buf[..bytes_read])
            .map_err(ExtractionError::Io)?;

        total = total
            .checked_add(bytes_read as u64)
            .ok_or_else(|| ExtractionError::InvalidArchive("byte count overflow".into()))?;
    }

    Ok(total)
}

/// Reads and discards exactly `size` bytes from `reader`.
///
/// Used to step over archive entries that cannot be decoded while keeping the
/// stream positioned at the next entry header.
///
/// # Errors
///
/// Returns an `UnexpectedEof` I/O error if the stream ends before `size`
/// bytes were consumed.
pub fn skip_exact<R: Read + ?Sized>(
    reader: &mut R,
    size: u64,
    buffer: &mut CopyBuffer,
) -> Result<u64> {
    let mut remaining = size;
    while remaining > 0 {
        let want = usize::try_from(remaining).map_or(COPY_BUFFER_SIZE, |r| r.min(COPY_BUFFER_SIZE));
        let n = match reader.read(&mut buffer.buf[..want]) {
            Ok(0) => {
                return Err(ExtractionError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("entry truncated: {remaining} of {size} bytes missing"),
                )));
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ExtractionError::Io(e)),
        };
        remaining -= n as u64;
    }
    Ok(size)
}
