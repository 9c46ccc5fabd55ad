//! Interned string handles.

use std::fmt;

/// Handle to an interned string.
///
/// Names are 4-byte indices into a [`StringInterner`](crate::StringInterner).
/// Two names compare equal iff their strings are equal, so identifier and
/// path comparisons are O(1) integer compares.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// The empty string, pre-interned at index 0.
    pub const EMPTY: Name = Name(0);

    /// Create a name from a raw interner index.
    #[inline]
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Name(raw)
    }

    /// Raw interner index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check whether this is the empty string.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for Name {
    fn default() -> Self {
        Name::EMPTY
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_empty() {
        assert!(Name::EMPTY.is_empty());
        assert_eq!(Name::default(), Name::EMPTY);
    }

    #[test]
    fn test_name_ordering() {
        let a = Name::from_raw(1);
        let b = Name::from_raw(2);
        assert!(a < b);
        assert_ne!(a, b);
    }
}
