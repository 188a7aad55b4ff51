//! POSIX permission decoding.
//!
//! Archive formats store modes in different places (tar header mode, zip
//! external attributes, ar header mode). Format handlers normalize those to a
//! raw integer through [`crate::formats::traits::EntryMode`]; this module only
//! ever sees that integer.

use std::fmt;

/// Read/write/execute flags for one permission class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Access {
    /// Read permission.
    pub read: bool,
    /// Write permission.
    pub write: bool,
    /// Execute (or search, for directories) permission.
    pub execute: bool,
}

impl Access {
    fn from_digit(digit: u32) -> Self {
        Self {
            read: digit & 0b100 != 0,
            write: digit & 0b010 != 0,
            execute: digit & 0b001 != 0,
        }
    }

    fn digit(self) -> u32 {
        (u32::from(self.read) << 2) | (u32::from(self.write) << 1) | u32::from(self.execute)
    }
}

/// Permissions for owner, group and other.
///
/// # Examples
///
/// ```
/// use boost_fetch_core::permissions::PermissionSet;
///
/// let perms = PermissionSet::from_mode(0o754);
/// assert_eq!(perms.to_string(), "rwxr-xr--");
/// assert_eq!(perms.mode(), 0o754);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PermissionSet {
    /// Owner permissions.
    pub owner: Access,
    /// Group permissions.
    pub group: Access,
    /// Permissions for everyone else.
    pub other: Access,
}

impl PermissionSet {
    /// Decodes the low nine bits of a Unix mode.
    ///
    /// Bits above the permission bits (file type, setuid, sticky) are
    /// ignored, so any integer decodes.
    #[must_use]
    pub fn from_mode(mode: u32) -> Self {
        Self {
            owner: Access::from_digit((mode >> 6) & 0o7),
            group: Access::from_digit((mode >> 3) & 0o7),
            other: Access::from_digit(mode & 0o7),
        }
    }

    /// Parses a nine-character `rwxr-x---` string.
    ///
    /// Returns `None` unless every position holds its expected letter or `-`.
    #[must_use]
    pub fn from_symbolic(symbolic: &str) -> Option<Self> {
        let bytes = symbolic.as_bytes();
        if bytes.len() != 9 {
            return None;
        }
        let mut mode = 0;
        for (i, &b) in bytes.iter().enumerate() {
            let expected = [b'r', b'w', b'x'][i % 3];
            mode <<= 1;
            if b == expected {
                mode |= 1;
            } else if b != b'-' {
                return None;
            }
        }
        Some(Self::from_mode(mode))
    }

    /// Encodes the set back into the low nine mode bits.
    #[must_use]
    pub fn mode(self) -> u32 {
        (self.owner.digit() << 6) | (self.group.digit() << 3) | self.other.digit()
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for access in [self.owner, self.group, self.other] {
            let r = if access.read { 'r' } else { '-' };
            let w = if access.write { 'w' } else { '-' };
            let x = if access.execute { 'x' } else { '-' };
            write!(f, "{r}{w}{x}")?;
        }
        Ok(())
    }
}

/// Decodes a raw mode into a [`PermissionSet`].
#[must_use]
pub fn decode(mode: u32) -> PermissionSet {
    PermissionSet::from_mode(mode)
}
