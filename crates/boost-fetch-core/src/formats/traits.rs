//! Common traits for archive entry metadata.

use crate::permissions::PermissionSet;

/// POSIX mode capability of an archive entry.
///
/// Tar, zip and ar each store permission bits in their own header field;
/// every entry view implements this trait so that the rest of the crate only
/// deals with the raw integer.
pub trait EntryMode {
    /// Returns `true` if the entry carries POSIX permission bits.
    fn has_posix_mode(&self) -> bool;

    /// The raw mode as stored by the format, if present.
    fn raw_mode(&self) -> Option<u32>;

    /// The decoded permission set, if the entry has a mode.
    fn permissions(&self) -> Option<PermissionSet> {
        if self.has_posix_mode() {
            self.raw_mode().map(PermissionSet::from_mode)
        } else {
            None
        }
    }
}

/// Mode stored in a tar header.
#[derive(Debug, Clone, Copy)]
pub struct TarMode(pub Option<u32>);

impl From<&tar::Header> for TarMode {
    fn from(header: &tar::Header) -> Self {
        Self(header.mode().ok())
    }
}

impl EntryMode for TarMode {
    fn has_posix_mode(&self) -> bool {
        self.0.is_some()
    }

    fn raw_mode(&self) -> Option<u32> {
        self.0
    }
}

/// Unix mode from a zip entry's external attributes, as decoded by
/// `zip::read::ZipFile::unix_mode`.
///
/// MS-DOS entries get a synthesized mode (`0o664` for files, `0o775` for
/// directories, write bits cleared when read-only). Entries from other
/// systems, or with no attributes at all, carry none.
#[derive(Debug, Clone, Copy)]
pub struct ZipMode(pub Option<u32>);

impl EntryMode for ZipMode {
    fn has_posix_mode(&self) -> bool {
        self.0.is_some()
    }

    fn raw_mode(&self) -> Option<u32> {
        self.0
    }
}

/// Mode stored in an ar member header. Always present.
#[derive(Debug, Clone, Copy)]
pub struct ArMode(pub u32);

impl From<&ar::Header> for ArMode {
    fn from(header: &ar::Header) -> Self {
        Self(header.mode())
    }
}

impl EntryMode for ArMode {
    fn has_posix_mode(&self) -> bool {
        true
    }

    fn raw_mode(&self) -> Option<u32> {
        Some(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tar_mode_from_header() {
        let mut header = tar::Header::new_gnu();
        header.set_mode(0o755);
        let mode = TarMode::from(&header);
        assert!(mode.has_posix_mode());
        assert_eq!(mode.permissions().map(|p| p.to_string()).as_deref(), Some("rwxr-xr-x"));
    }

    #[test]
    fn test_zip_mode_without_unix_attributes() {
        let mode = ZipMode(None);
        assert!(!mode.has_posix_mode());
        assert_eq!(mode.permissions(), None);
    }

    #[test]
    fn test_zip_mode_strips_file_type() {
        let mode = ZipMode(Some(0o100_640));
        assert_eq!(mode.permissions().map(PermissionSet::mode), Some(0o640));
    }

    #[test]
    fn test_ar_mode_always_present() {
        let mut header = ar::Header::new(b"member.o".to_vec(), 0);
        header.set_mode(0o600);
        let mode = ArMode::from(&header);
        assert!(mode.has_posix_mode());
        assert_eq!(mode.raw_mode(), Some(0o600));
    }
}
