//! Unified type pool.
//!
//! All types live in one pool and are referenced by [`TypeId`]. Structural
//! types (lists, maps, references) are deduplicated so equal structures get
//! equal IDs; records are nominal and minted fresh on every declaration.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use velo_ir::{Name, StringInterner};

use crate::{FieldData, RecordData, TypeData, TypeId, TypeTag};

/// Error from record declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypePoolError {
    /// The given ID does not refer to a record type.
    NotARecord(TypeId),
    /// `define_record` was called twice for the same reservation.
    RecordAlreadyDefined(TypeId),
}

impl std::fmt::Display for TypePoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypePoolError::NotARecord(id) => write!(f, "{id} is not a record type"),
            TypePoolError::RecordAlreadyDefined(id) => {
                write!(f, "record {id} is already defined")
            }
        }
    }
}

impl std::error::Error for TypePoolError {}

struct PoolInner {
    /// Storage for type data, indexed by `TypeId`.
    types: Vec<TypeData>,
    /// Map from structural type data to index for deduplication.
    /// Records are never entered here.
    dedup: FxHashMap<TypeData, u32>,
}

impl PoolInner {
    fn with_primitives() -> Self {
        let mut inner = PoolInner {
            types: Vec::with_capacity(64),
            dedup: FxHashMap::default(),
        };

        // Pre-intern primitives at fixed indices matching TypeId constants
        let primitives = [
            TypeData::Int,     // 0 = TypeId::INT
            TypeData::Float,   // 1 = TypeId::FLOAT
            TypeData::Bool,    // 2 = TypeId::BOOL
            TypeData::Str,     // 3 = TypeId::STR
            TypeData::Unknown, // 4 = TypeId::UNKNOWN
        ];

        for (idx, data) in primitives.into_iter().enumerate() {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "primitives count is fixed and small"
            )]
            let idx_u32 = idx as u32;
            inner.dedup.insert(data.clone(), idx_u32);
            inner.types.push(data);
        }

        inner
    }

    fn next_id(&self, what: &str) -> u32 {
        u32::try_from(self.types.len()).unwrap_or_else(|_| panic!("too many {what} in type pool"))
    }
}

/// Thread-safe type pool.
///
/// # Thread Safety
/// Uses an `RwLock` internally; all methods take `&self`. Wrap in `Arc` to
/// share between compilation and render-time sub-template compilation.
pub struct TypePool {
    inner: RwLock<PoolInner>,
}

impl TypePool {
    /// Create a new pool with pre-interned primitives.
    pub fn new() -> Self {
        TypePool {
            inner: RwLock::new(PoolInner::with_primitives()),
        }
    }

    /// Intern a structural (non-record) type, deduplicating.
    fn intern_structural(&self, data: TypeData) -> TypeId {
        debug_assert!(
            !matches!(data, TypeData::Record(_)),
            "records are nominal and must go through reserve_record"
        );

        // Fast path: check if already interned
        {
            let guard = self.inner.read();
            if let Some(&idx) = guard.dedup.get(&data) {
                return TypeId::from_raw(idx);
            }
        }

        // Slow path: need to insert
        let mut guard = self.inner.write();

        // Double-check after acquiring write lock
        if let Some(&idx) = guard.dedup.get(&data) {
            return TypeId::from_raw(idx);
        }

        let idx = guard.next_id("structural types");
        guard.types.push(data.clone());
        guard.dedup.insert(data, idx);
        TypeId::from_raw(idx)
    }

    /// The list type `[elem]`.
    pub fn list_of(&self, elem: TypeId) -> TypeId {
        self.intern_structural(TypeData::List(elem))
    }

    /// The string-keyed map type `{str: value}`.
    pub fn map_of(&self, value: TypeId) -> TypeId {
        self.intern_structural(TypeData::Map(value))
    }

    /// The reference type `&target`.
    pub fn ref_of(&self, target: TypeId) -> TypeId {
        self.intern_structural(TypeData::Ref(target))
    }

    /// Reserve a record type with no fields yet.
    ///
    /// The returned ID is usable immediately (e.g. inside `ref_of` for a
    /// self-referential field); fill it in with [`define_record`].
    ///
    /// [`define_record`]: TypePool::define_record
    pub fn reserve_record(&self, name: Name) -> TypeId {
        let mut guard = self.inner.write();
        let idx = guard.next_id("record types");
        guard.types.push(TypeData::Record(RecordData {
            name,
            fields: Box::new([]),
        }));
        TypeId::from_raw(idx)
    }

    /// Fill in the fields of a reserved record.
    ///
    /// Fails if `id` is not a record or was already defined with fields.
    pub fn define_record(&self, id: TypeId, fields: Vec<FieldData>) -> Result<(), TypePoolError> {
        let mut guard = self.inner.write();
        match guard.types.get_mut(id.raw() as usize) {
            Some(TypeData::Record(rec)) => {
                if rec.fields.is_empty() {
                    rec.fields = fields.into_boxed_slice();
                    Ok(())
                } else {
                    Err(TypePoolError::RecordAlreadyDefined(id))
                }
            }
            _ => Err(TypePoolError::NotARecord(id)),
        }
    }

    /// Declare a record in one step (reserve + define).
    ///
    /// Convenience for records with no self-referential fields.
    pub fn record(&self, name: Name, fields: Vec<FieldData>) -> TypeId {
        let mut guard = self.inner.write();
        let idx = guard.next_id("record types");
        guard.types.push(TypeData::Record(RecordData {
            name,
            fields: fields.into_boxed_slice(),
        }));
        TypeId::from_raw(idx)
    }

    /// Discriminant tag for a type.
    ///
    /// # Panics
    /// Panics if `id` is `NONE` or was not minted by this pool.
    pub fn tag(&self, id: TypeId) -> TypeTag {
        self.inner.read().types[id.raw() as usize].tag()
    }

    /// Clone out the full type data.
    pub fn data(&self, id: TypeId) -> TypeData {
        self.inner.read().types[id.raw() as usize].clone()
    }

    /// Element type of a list or map.
    pub fn elem_of(&self, id: TypeId) -> Option<TypeId> {
        match &self.inner.read().types[id.raw() as usize] {
            TypeData::List(t) | TypeData::Map(t) => Some(*t),
            _ => None,
        }
    }

    /// Target of a reference type.
    pub fn ref_target(&self, id: TypeId) -> Option<TypeId> {
        match &self.inner.read().types[id.raw() as usize] {
            TypeData::Ref(t) => Some(*t),
            _ => None,
        }
    }

    /// Follow reference types to the underlying type.
    pub fn deref(&self, id: TypeId) -> TypeId {
        let guard = self.inner.read();
        let mut cur = id;
        loop {
            match &guard.types[cur.raw() as usize] {
                TypeData::Ref(t) => cur = *t,
                _ => return cur,
            }
        }
    }

    /// Declared name of a record type.
    pub fn record_name(&self, id: TypeId) -> Option<Name> {
        match &self.inner.read().types[id.raw() as usize] {
            TypeData::Record(rec) => Some(rec.name),
            _ => None,
        }
    }

    /// Clone out the fields of a record type.
    pub fn record_fields(&self, id: TypeId) -> Option<Box<[FieldData]>> {
        match &self.inner.read().types[id.raw() as usize] {
            TypeData::Record(rec) => Some(rec.fields.clone()),
            _ => None,
        }
    }

    /// Look up a record field by declared name.
    ///
    /// Returns the field's positional index and data.
    pub fn record_field(&self, id: TypeId, name: Name) -> Option<(usize, FieldData)> {
        match &self.inner.read().types[id.raw() as usize] {
            TypeData::Record(rec) => rec
                .fields
                .iter()
                .position(|f| f.name == name)
                .map(|i| (i, rec.fields[i].clone())),
            _ => None,
        }
    }

    /// Human-readable type name for error messages.
    pub fn display(&self, id: TypeId, interner: &StringInterner) -> String {
        if id.is_none() {
            return "<none>".to_owned();
        }
        if let Some(name) = id.name() {
            return name.to_owned();
        }
        match self.data(id) {
            TypeData::List(t) => format!("[{}]", self.display(t, interner)),
            TypeData::Map(t) => format!("{{str: {}}}", self.display(t, interner)),
            TypeData::Ref(t) => format!("&{}", self.display(t, interner)),
            TypeData::Record(rec) => interner.lookup(rec.name).to_string(),
            // Primitives are handled by `id.name()` above
            _ => id.to_string(),
        }
    }

    /// Number of types in the pool.
    pub fn type_count(&self) -> usize {
        self.inner.read().types.len()
    }
}

impl Default for TypePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn structural_types_dedup() {
        let pool = TypePool::new();
        let a = pool.list_of(TypeId::INT);
        let b = pool.list_of(TypeId::INT);
        let c = pool.list_of(TypeId::STR);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.elem_of(a), Some(TypeId::INT));
    }

    #[test]
    fn records_are_nominal() {
        let interner = StringInterner::new();
        let pool = TypePool::new();
        let name = interner.intern("User");

        let a = pool.record(name, vec![]);
        let b = pool.record(name, vec![]);
        assert_ne!(a, b);
    }

    #[test]
    fn reserve_then_define() {
        let interner = StringInterner::new();
        let pool = TypePool::new();

        let node = pool.reserve_record(interner.intern("Node"));
        let next_ty = pool.ref_of(node);
        let fields = vec![
            FieldData::new(interner.intern("Value"), TypeId::INT),
            FieldData::new(interner.intern("Next"), next_ty),
        ];
        pool.define_record(node, fields).unwrap();

        let (idx, next) = pool.record_field(node, interner.intern("Next")).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(pool.deref(next.ty), node);
    }

    #[test]
    fn define_twice_fails() {
        let interner = StringInterner::new();
        let pool = TypePool::new();
        let id = pool.reserve_record(interner.intern("T"));

        pool.define_record(id, vec![FieldData::new(interner.intern("x"), TypeId::INT)])
            .unwrap();
        let again =
            pool.define_record(id, vec![FieldData::new(interner.intern("y"), TypeId::INT)]);
        assert_eq!(again, Err(TypePoolError::RecordAlreadyDefined(id)));
    }

    #[test]
    fn define_non_record_fails() {
        let pool = TypePool::new();
        let list = pool.list_of(TypeId::INT);
        let res = pool.define_record(list, vec![]);
        assert_eq!(res, Err(TypePoolError::NotARecord(list)));
    }

    #[test]
    fn display_compound_types() {
        let interner = StringInterner::new();
        let pool = TypePool::new();

        let user = pool.record(interner.intern("User"), vec![]);
        let list = pool.list_of(user);
        let map = pool.map_of(TypeId::INT);
        let re = pool.ref_of(user);

        assert_eq!(pool.display(list, &interner), "[User]");
        assert_eq!(pool.display(map, &interner), "{str: int}");
        assert_eq!(pool.display(re, &interner), "&User");
        assert_eq!(pool.display(TypeId::INT, &interner), "int");
    }
}
