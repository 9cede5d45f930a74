// SPDX-License-Identifier: Apache-2.0

//! Permission bitmask: `READ = 1`, `WRITE = 2`. `WRITE` alone is always
//! normalized to `READ | WRITE`: there is no such thing as a write-only
//! handle, since a transaction must read the live region to take its
//! snapshot and a state's direct mapping is always readable.

use crate::error::{Error, Result};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Permissions(u8);

impl Permissions {
    pub const READ: Permissions = Permissions(0b01);
    pub const WRITE: Permissions = Permissions(0b10);
    pub(crate) const NONE: Permissions = Permissions(0);

    pub fn from_bits(bits: u8) -> Result<Self> {
        if bits == 0 || bits & !(Self::READ.0 | Self::WRITE.0) != 0 {
            return Err(Error::InvalidArgument);
        }
        let p = Permissions(bits);
        Ok(if p == Self::WRITE { Self::READ | Self::WRITE } else { p })
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_readable(self) -> bool {
        self.0 & Self::READ.0 != 0
    }

    pub fn is_writable(self) -> bool {
        self.0 & Self::WRITE.0 != 0
    }

    pub fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 | rhs.0)
    }
}

impl std::fmt::Display for Permissions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.is_readable(), self.is_writable()) {
            (true, true) => write!(f, "write"),
            (true, false) => write!(f, "read"),
            (false, _) => write!(f, "<no permissions>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_alone_normalizes_to_read_write() {
        let p = Permissions::from_bits(Permissions::WRITE.bits()).unwrap();
        assert!(p.is_readable());
        assert!(p.is_writable());
    }

    #[test]
    fn read_alone_stays_read_only() {
        let p = Permissions::from_bits(Permissions::READ.bits()).unwrap();
        assert!(p.is_readable());
        assert!(!p.is_writable());
    }

    #[test]
    fn zero_is_invalid() {
        assert!(matches!(Permissions::from_bits(0), Err(Error::InvalidArgument)));
    }

    #[test]
    fn unknown_bits_are_invalid() {
        assert!(matches!(Permissions::from_bits(0b100), Err(Error::InvalidArgument)));
    }

    #[test]
    fn display_matches_spec_format() {
        assert_eq!(Permissions::READ.to_string(), "read");
        assert_eq!((Permissions::READ | Permissions::WRITE).to_string(), "write");
        assert_eq!(Permissions::NONE.to_string(), "<no permissions>");
    }
}
