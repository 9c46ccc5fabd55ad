//! Unified type index handle.
//!
//! `TypeId` is THE canonical type representation in the engine.
//! All types are stored in a unified pool and referenced by their 32-bit index.
//!
//! # Design
//!
//! - 32-bit indices allow 4+ billion unique types
//! - Primitive types have fixed indices (0-4) for O(1) lookup
//! - Type equality is O(1) index comparison
//! - Copy, lightweight passing

use std::fmt;

/// A 32-bit index into the type pool.
///
/// Types are compared by index equality (O(1)), not structural comparison.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    // === Primitive Types (indices 0-4) ===
    // These are pre-interned at pool creation for O(1) access.

    /// The `int` type (64-bit signed integer).
    pub const INT: Self = Self(0);
    /// The `float` type (64-bit IEEE 754).
    pub const FLOAT: Self = Self(1);
    /// The `bool` type.
    pub const BOOL: Self = Self(2);
    /// The `str` type (UTF-8 string).
    pub const STR: Self = Self(3);
    /// Placeholder for selectors whose type is not resolved yet.
    pub const UNKNOWN: Self = Self(4);

    /// First index for dynamically allocated types.
    pub const FIRST_DYNAMIC: u32 = 5;

    /// Sentinel value indicating no type / invalid index.
    pub const NONE: Self = Self(u32::MAX);

    /// Create an index from a raw u32 value.
    ///
    /// The caller must ensure the index is valid in the pool.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this is a primitive type (pre-interned).
    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.0 < Self::FIRST_DYNAMIC
    }

    /// Check if this is the NONE sentinel.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Check if this is the UNKNOWN placeholder.
    #[inline]
    pub const fn is_unknown(self) -> bool {
        self.0 == Self::UNKNOWN.0
    }

    /// Whether values of this type are scalar (int/float/bool/str).
    #[inline]
    pub const fn is_scalar(self) -> bool {
        self.0 < Self::UNKNOWN.0
    }

    /// Get the human-readable name for primitive types.
    ///
    /// Returns `None` for dynamic types, which need a pool to render
    /// their names.
    #[inline]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("int"),
            1 => Some("float"),
            2 => Some("bool"),
            3 => Some("str"),
            4 => Some("<unknown>"),
            _ => None,
        }
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INT => write!(f, "TypeId::INT"),
            Self::FLOAT => write!(f, "TypeId::FLOAT"),
            Self::BOOL => write!(f, "TypeId::BOOL"),
            Self::STR => write!(f, "TypeId::STR"),
            Self::UNKNOWN => write!(f, "TypeId::UNKNOWN"),
            Self::NONE => write!(f, "TypeId::NONE"),
            _ => write!(f, "TypeId({})", self.0),
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INT => write!(f, "int"),
            Self::FLOAT => write!(f, "float"),
            Self::BOOL => write!(f, "bool"),
            Self::STR => write!(f, "str"),
            Self::UNKNOWN => write!(f, "<unknown>"),
            Self::NONE => write!(f, "<none>"),
            _ => write!(f, "type#{}", self.0),
        }
    }
}

// Compile-time size assertion: TypeId must be exactly 4 bytes
const _: () = assert!(std::mem::size_of::<TypeId>() == 4);
