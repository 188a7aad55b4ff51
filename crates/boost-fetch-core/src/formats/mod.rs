//! Archive and compression format implementations.

pub mod archive;
pub mod compression;
pub mod detect;
pub mod traits;

pub(crate) mod ar;
pub(crate) mod common;
pub(crate) mod tar;
pub(crate) mod zip;

pub use archive::extract_archive;
pub use compression::CompressionCodec;
pub use compression::extract_compressor;
pub use detect::ArchiveKind;
pub use traits::EntryMode;
