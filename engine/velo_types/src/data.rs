//! Internal type representation for the type pool.
//!
//! `TypeData` is what the pool stores. External code works with `TypeId`
//! (u32 indices) for O(1) equality.

use velo_ir::Name;

use crate::TypeId;

/// A record field declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FieldData {
    /// Declared field name (the name used in selector paths).
    pub name: Name,
    /// Output name for schema splicing; equals `name` unless renamed.
    pub rename: Name,
    /// Field type.
    pub ty: TypeId,
}

impl FieldData {
    /// Field with no rename.
    pub fn new(name: Name, ty: TypeId) -> Self {
        FieldData {
            name,
            rename: name,
            ty,
        }
    }

    /// Field exposed under a different name when spliced into a schema.
    pub fn renamed(name: Name, rename: Name, ty: TypeId) -> Self {
        FieldData { name, rename, ty }
    }
}

/// A record type: named, ordered fields.
///
/// Records are nominal: each `reserve_record` call mints a fresh `TypeId`,
/// and two records never compare equal by structure.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct RecordData {
    pub name: Name,
    pub fields: Box<[FieldData]>,
}

/// Internal type representation stored in the pool.
///
/// Compound types store `TypeId` children, not boxed types, enabling O(1)
/// type equality.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeData {
    // Primitives (pre-interned at fixed indices)
    /// Integer type (64-bit signed)
    Int,
    /// Floating point type (64-bit IEEE 754)
    Float,
    /// Boolean type
    Bool,
    /// String type (UTF-8)
    Str,
    /// Placeholder for unresolved selectors
    Unknown,

    // Compound types with TypeId children
    /// List type: [T]
    List(TypeId),
    /// Map type with string keys: {str: T}
    Map(TypeId),
    /// Reference to another type: &T. A reference-typed slot holds either
    /// the referent value or Null.
    Ref(TypeId),
    /// Record type (nominal, never deduplicated)
    Record(RecordData),
}

/// Cheap discriminant for dispatching on a type without cloning its data.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeTag {
    Int,
    Float,
    Bool,
    Str,
    Unknown,
    List,
    Map,
    Ref,
    Record,
}

impl TypeData {
    /// Discriminant tag for this type.
    pub fn tag(&self) -> TypeTag {
        match self {
            TypeData::Int => TypeTag::Int,
            TypeData::Float => TypeTag::Float,
            TypeData::Bool => TypeTag::Bool,
            TypeData::Str => TypeTag::Str,
            TypeData::Unknown => TypeTag::Unknown,
            TypeData::List(_) => TypeTag::List,
            TypeData::Map(_) => TypeTag::Map,
            TypeData::Ref(_) => TypeTag::Ref,
            TypeData::Record(_) => TypeTag::Record,
        }
    }
}
