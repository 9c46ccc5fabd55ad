//! Runtime values for the Velo render state.
//!
//! # Thread Safety
//!
//! All heap-backed variants use `Arc` internally, so values can be captured
//! by `Send + Sync` execution closures and copied between render states
//! cheaply (refcount bump, no deep clone).
//!
//! # Coercion
//!
//! The typed accessors (`coerce_int` and friends) are total: a mismatched
//! variant coerces to the zero value instead of panicking. The plan compiler
//! only pairs an accessor with a slot of the matching static type, so the
//! mismatch arm is effectively the Null-to-zero rule from the data model.

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::OnceLock;

use crate::{TypeData, TypeId, TypePool, TypeTag};

fn empty_str() -> Arc<str> {
    static EMPTY: OnceLock<Arc<str>> = OnceLock::new();
    EMPTY.get_or_init(|| Arc::from("")).clone()
}

fn empty_list() -> Arc<[Value]> {
    static EMPTY: OnceLock<Arc<[Value]>> = OnceLock::new();
    EMPTY.get_or_init(|| Arc::from(Vec::new())).clone()
}

fn empty_map() -> Arc<FxHashMap<String, Value>> {
    static EMPTY: OnceLock<Arc<FxHashMap<String, Value>>> = OnceLock::new();
    EMPTY.get_or_init(|| Arc::new(FxHashMap::default())).clone()
}

/// A record instance: its type plus one value per field, in declaration
/// order.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordValue {
    pub ty: TypeId,
    pub fields: Box<[Value]>,
}

/// Runtime value in the Velo engine.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absent value. Reading through Null yields the zero value of the
    /// target type.
    Null,
    /// Integer value (64-bit signed).
    Int(i64),
    /// Floating-point value (64-bit IEEE 754).
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// String value.
    Str(Arc<str>),
    /// List of values.
    List(Arc<[Value]>),
    /// Map from string keys to values.
    Map(Arc<FxHashMap<String, Value>>),
    /// Record instance.
    Record(Arc<RecordValue>),
}

// Factory methods

impl Value {
    /// Create an integer value.
    #[inline]
    pub fn int(n: i64) -> Self {
        Value::Int(n)
    }

    /// Create a float value.
    #[inline]
    pub fn float(f: f64) -> Self {
        Value::Float(f)
    }

    /// Create a string value.
    #[inline]
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Create a list value.
    #[inline]
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::from(items))
    }

    /// Create a map value with String keys.
    #[inline]
    pub fn map(entries: FxHashMap<String, Value>) -> Self {
        Value::Map(Arc::new(entries))
    }

    /// Create a record value. Field order must match the declaration.
    #[inline]
    pub fn record(ty: TypeId, fields: Vec<Value>) -> Self {
        Value::Record(Arc::new(RecordValue {
            ty,
            fields: fields.into_boxed_slice(),
        }))
    }
}

// Typed accessors

impl Value {
    /// Read as int; Null (or foreign variant) coerces to 0.
    #[inline]
    pub fn coerce_int(&self) -> i64 {
        match self {
            Value::Int(v) => *v,
            _ => 0,
        }
    }

    /// Read as float; ints widen, Null coerces to 0.0.
    #[inline]
    pub fn coerce_float(&self) -> f64 {
        match self {
            Value::Float(v) => *v,
            #[expect(clippy::cast_precision_loss, reason = "int-to-float widening is lossy by language rule")]
            Value::Int(v) => *v as f64,
            _ => 0.0,
        }
    }

    /// Read as bool; Null coerces to false.
    #[inline]
    pub fn coerce_bool(&self) -> bool {
        match self {
            Value::Bool(v) => *v,
            _ => false,
        }
    }

    /// Read as string; Null coerces to the empty string.
    #[inline]
    pub fn coerce_str(&self) -> Arc<str> {
        match self {
            Value::Str(v) => v.clone(),
            _ => empty_str(),
        }
    }

    /// Read as list; Null coerces to the empty list.
    #[inline]
    pub fn coerce_list(&self) -> Arc<[Value]> {
        match self {
            Value::List(v) => v.clone(),
            _ => empty_list(),
        }
    }

    /// Read as map; Null coerces to the empty map.
    #[inline]
    pub fn coerce_map(&self) -> Arc<FxHashMap<String, Value>> {
        match self {
            Value::Map(v) => v.clone(),
            _ => empty_map(),
        }
    }

    /// Borrow as record, if this is one.
    #[inline]
    pub fn as_record(&self) -> Option<&RecordValue> {
        match self {
            Value::Record(rv) => Some(rv),
            _ => None,
        }
    }

    /// Whether this value is Null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of this value's runtime kind, for error messages.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    /// Check whether this runtime value can occupy a slot of static type
    /// `ty`. Null fits any non-scalar type; container elements are checked
    /// recursively.
    pub fn fits(&self, pool: &TypePool, ty: TypeId) -> bool {
        let ty = pool.deref(ty);
        match (self, pool.tag(ty)) {
            (Value::Null, tag) => !matches!(
                tag,
                TypeTag::Int | TypeTag::Float | TypeTag::Bool | TypeTag::Str
            ),
            (Value::Int(_), TypeTag::Int)
            | (Value::Float(_), TypeTag::Float)
            | (Value::Bool(_), TypeTag::Bool)
            | (Value::Str(_), TypeTag::Str) => true,
            (Value::List(items), TypeTag::List) => match pool.elem_of(ty) {
                Some(elem) => items.iter().all(|v| v.fits(pool, elem)),
                None => false,
            },
            (Value::Map(entries), TypeTag::Map) => match pool.elem_of(ty) {
                Some(elem) => entries.values().all(|v| v.fits(pool, elem)),
                None => false,
            },
            (Value::Record(rv), TypeTag::Record) => rv.ty == ty,
            _ => false,
        }
    }
}

impl TypePool {
    /// The zero value of a type: 0, 0.0, false, "", empty list/map, or
    /// Null for records and references.
    pub fn zero_value(&self, ty: TypeId) -> Value {
        match self.data(ty) {
            TypeData::Int => Value::Int(0),
            TypeData::Float => Value::Float(0.0),
            TypeData::Bool => Value::Bool(false),
            TypeData::Str => Value::Str(empty_str()),
            TypeData::List(_) => Value::List(empty_list()),
            TypeData::Map(_) => Value::Map(empty_map()),
            TypeData::Ref(_) | TypeData::Record(_) | TypeData::Unknown => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    /// Render a value the way bare output statements do: scalars plainly,
    /// Null as nothing, containers in a bracketed debug-ish form (maps
    /// sorted by key so output is deterministic).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(v),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                f.write_str("{")?;
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {}", entries[*key])?;
                }
                f.write_str("}")
            }
            Value::Record(rv) => {
                f.write_str("{")?;
                for (i, field) in rv.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}")?;
                }
                f.write_str("}")
            }
        }
    }
}
