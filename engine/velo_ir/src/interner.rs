//! String interner for identifier and literal storage.
//!
//! Provides O(1) interning and lookup with thread-safe concurrent access.
//! Interned strings are stored as `Arc<str>` rather than leaked, because
//! sub-template evaluation interns text that only arrives at render time
//! and a leaking interner would grow without bound in long-lived hosts.

use crate::Name;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Error when interning a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternError {
    /// Interner exceeded capacity (over 4 billion strings).
    Overflow { count: usize },
}

impl std::fmt::Display for InternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InternError::Overflow { count } => write!(
                f,
                "interner exceeded capacity: {} strings, max is {}",
                count,
                u32::MAX
            ),
        }
    }
}

impl std::error::Error for InternError {}

struct InternerInner {
    /// Map from string content to index.
    map: FxHashMap<Arc<str>, u32>,
    /// Storage for string contents.
    strings: Vec<Arc<str>>,
}

impl InternerInner {
    fn with_empty() -> Self {
        let mut inner = InternerInner {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(256),
        };
        // Pre-intern empty string at index 0 so Name::EMPTY is always valid.
        let empty: Arc<str> = Arc::from("");
        inner.map.insert(empty.clone(), 0);
        inner.strings.push(empty);
        inner
    }
}

/// Thread-safe string interner.
///
/// Provides O(1) lookup and equality comparison for interned strings.
///
/// # Thread Safety
/// Uses an `RwLock` for concurrent read/write access. Wrap in `Arc` to share
/// across compilation and render threads.
pub struct StringInterner {
    inner: RwLock<InternerInner>,
}

impl StringInterner {
    /// Create a new interner with pre-interned keywords.
    pub fn new() -> Self {
        let interner = StringInterner {
            inner: RwLock::new(InternerInner::with_empty()),
        };
        interner.pre_intern_keywords();
        interner
    }

    /// Try to intern a string, returning its Name or an error on overflow.
    #[inline]
    pub fn try_intern(&self, s: &str) -> Result<Name, InternError> {
        // Fast path: check if already interned
        {
            let guard = self.inner.read();
            if let Some(&idx) = guard.map.get(s) {
                return Ok(Name::from_raw(idx));
            }
        }

        // Slow path: need to insert
        let mut guard = self.inner.write();

        // Double-check after acquiring write lock
        if let Some(&idx) = guard.map.get(s) {
            return Ok(Name::from_raw(idx));
        }

        let idx = u32::try_from(guard.strings.len()).map_err(|_| InternError::Overflow {
            count: guard.strings.len(),
        })?;
        let stored: Arc<str> = Arc::from(s);
        guard.strings.push(stored.clone());
        guard.map.insert(stored, idx);

        Ok(Name::from_raw(idx))
    }

    /// Intern a string, returning its Name.
    ///
    /// # Panics
    /// Panics if the interner exceeds capacity (over 4 billion strings).
    /// Use `try_intern` for fallible interning.
    #[inline]
    pub fn intern(&self, s: &str) -> Name {
        self.try_intern(s).unwrap_or_else(|e| panic!("{}", e))
    }

    /// Look up the string for a Name.
    ///
    /// The returned `Arc` is a cheap refcount bump on shared storage.
    pub fn lookup(&self, name: Name) -> Arc<str> {
        let guard = self.inner.read();
        guard.strings[name.raw() as usize].clone()
    }

    /// Pre-intern directive keywords and common identifiers.
    fn pre_intern_keywords(&self) {
        const KEYWORDS: &[&str] = &[
            // Directives
            "set",
            "if",
            "elseif",
            "else",
            "end",
            "foreach",
            "for",
            "evaluate",
            "in",
            "true",
            "false",
            // Primitive type names
            "int",
            "float",
            "bool",
            "str",
        ];

        for kw in KEYWORDS {
            self.intern(kw);
        }
    }

    /// Get the number of interned strings.
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    /// Check if the interner is empty (only has the empty string).
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_lookup() {
        let interner = StringInterner::new();

        let hello = interner.intern("hello");
        let world = interner.intern("world");
        let hello2 = interner.intern("hello");

        assert_eq!(hello, hello2);
        assert_ne!(hello, world);

        assert_eq!(&*interner.lookup(hello), "hello");
        assert_eq!(&*interner.lookup(world), "world");
    }

    #[test]
    fn test_empty_string() {
        let interner = StringInterner::new();
        let empty = interner.intern("");
        assert_eq!(empty, Name::EMPTY);
        assert_eq!(&*interner.lookup(Name::EMPTY), "");
    }

    #[test]
    fn test_keywords_pre_interned() {
        let interner = StringInterner::new();
        let before = interner.len();

        let set = interner.intern("set");
        let foreach = interner.intern("foreach");

        // Keywords were already present, so interning them adds nothing.
        assert_eq!(interner.len(), before);
        assert_eq!(&*interner.lookup(set), "set");
        assert_eq!(&*interner.lookup(foreach), "foreach");
    }

    #[test]
    fn test_shared_across_threads() {
        let interner = std::sync::Arc::new(StringInterner::new());
        let other = interner.clone();

        let handle = std::thread::spawn(move || other.intern("shared"));
        let theirs = handle.join().unwrap_or(Name::EMPTY);
        let ours = interner.intern("shared");

        assert_eq!(ours, theirs);
    }
}
