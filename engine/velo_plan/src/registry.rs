//! Function registry.
//!
//! Templates call functions through a receiver: `$value.Fn(args)`. The
//! registry maps `(receiver type, name)` to a declared signature plus an
//! implementation. Common signatures get specialized variants that compile
//! to a plain function-pointer invocation; everything else goes through
//! the generic path, which receives the receiver as `args[0]`.
//!
//! Registration is by exact [`TypeId`] or by type kind ([`TypeTag`]), the
//! latter covering every list or map type at once.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use velo_types::{TypeId, TypePool, TypeTag, Value};

use crate::error::FnError;

/// Generic function implementation. The receiver is `args[0]`.
pub type GenericFn = Arc<dyn Fn(&[Value]) -> Result<Value, FnError> + Send + Sync>;

/// Implementation of a registered function.
#[derive(Clone)]
pub enum FnImpl {
    StrToStr(fn(&str) -> String),
    StrToInt(fn(&str) -> i64),
    StrToBool(fn(&str) -> bool),
    StrStrToBool(fn(&str, &str) -> bool),
    StrStrToStr(fn(&str, &str) -> String),
    ListToInt(fn(&[Value]) -> i64),
    Generic(GenericFn),
}

/// How a function's result type is derived.
#[derive(Copy, Clone, Debug)]
pub enum ReturnType {
    /// A fixed type, independent of the receiver.
    Fixed(TypeId),
    /// The receiver's element type (list and map helpers).
    Elem,
}

/// Declared signature and implementation of a function.
#[derive(Clone)]
pub struct FnDescriptor {
    /// Argument types, not counting the receiver.
    pub args: Vec<TypeId>,
    pub result: ReturnType,
    pub imp: FnImpl,
}

impl FnDescriptor {
    pub fn new(args: Vec<TypeId>, result: TypeId, imp: FnImpl) -> Self {
        FnDescriptor {
            args,
            result: ReturnType::Fixed(result),
            imp,
        }
    }

    /// Descriptor whose result is the receiver's element type.
    pub fn elem_result(args: Vec<TypeId>, imp: FnImpl) -> Self {
        FnDescriptor {
            args,
            result: ReturnType::Elem,
            imp,
        }
    }

    pub(crate) fn result_type(&self, receiver: TypeId, pool: &TypePool) -> Option<TypeId> {
        match self.result {
            ReturnType::Fixed(ty) => Some(ty),
            ReturnType::Elem => pool.elem_of(pool.deref(receiver)),
        }
    }
}

/// Receiver-addressed function table.
pub struct FnRegistry {
    exact: FxHashMap<TypeId, FxHashMap<Box<str>, FnDescriptor>>,
    by_tag: FxHashMap<TypeTag, FxHashMap<Box<str>, FnDescriptor>>,
}

impl FnRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        FnRegistry {
            exact: FxHashMap::default(),
            by_tag: FxHashMap::default(),
        }
    }

    /// Registry pre-loaded with the string, list, and map helpers.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        builtins::install(&mut reg);
        reg
    }

    /// Register against an exact receiver type. Re-registering a name
    /// replaces the previous descriptor.
    pub fn register(&mut self, receiver: TypeId, name: &str, descriptor: FnDescriptor) {
        self.exact
            .entry(receiver)
            .or_default()
            .insert(Box::from(name), descriptor);
    }

    /// Register against a whole type kind (all lists, all maps).
    pub fn register_for_tag(&mut self, tag: TypeTag, name: &str, descriptor: FnDescriptor) {
        self.by_tag
            .entry(tag)
            .or_default()
            .insert(Box::from(name), descriptor);
    }

    /// Exact-type registrations shadow kind-level ones.
    pub(crate) fn lookup(
        &self,
        receiver: TypeId,
        name: &str,
        pool: &TypePool,
    ) -> Option<&FnDescriptor> {
        if let Some(desc) = self.exact.get(&receiver).and_then(|fns| fns.get(name)) {
            return Some(desc);
        }
        self.by_tag
            .get(&pool.tag(receiver))
            .and_then(|fns| fns.get(name))
    }
}

impl Default for FnRegistry {
    fn default() -> Self {
        Self::new()
    }
}

mod builtins {
    use super::{FnDescriptor, FnImpl, FnRegistry};
    use velo_types::{TypeId, TypeTag, Value};

    use crate::error::FnError;
    use std::sync::Arc;

    fn clamp_len(len: usize) -> i64 {
        i64::try_from(len).unwrap_or(i64::MAX)
    }

    fn str_upper(s: &str) -> String {
        s.to_uppercase()
    }

    fn str_lower(s: &str) -> String {
        s.to_lowercase()
    }

    fn str_trim(s: &str) -> String {
        s.trim().to_owned()
    }

    fn str_len(s: &str) -> i64 {
        clamp_len(s.len())
    }

    fn str_is_empty(s: &str) -> bool {
        s.is_empty()
    }

    fn str_contains(s: &str, needle: &str) -> bool {
        s.contains(needle)
    }

    fn str_starts_with(s: &str, prefix: &str) -> bool {
        s.starts_with(prefix)
    }

    fn str_ends_with(s: &str, suffix: &str) -> bool {
        s.ends_with(suffix)
    }

    fn list_size(items: &[Value]) -> i64 {
        clamp_len(items.len())
    }

    fn receiver(args: &[Value]) -> Result<&Value, FnError> {
        args.first().ok_or_else(|| FnError::new("missing receiver"))
    }

    pub(super) fn install(reg: &mut FnRegistry) {
        use FnImpl::{ListToInt, StrStrToBool, StrToBool, StrToInt, StrToStr};

        let str_to_str = |f| FnDescriptor::new(vec![], TypeId::STR, StrToStr(f));
        reg.register(TypeId::STR, "Upper", str_to_str(str_upper));
        reg.register(TypeId::STR, "Lower", str_to_str(str_lower));
        reg.register(TypeId::STR, "Trim", str_to_str(str_trim));

        reg.register(
            TypeId::STR,
            "Len",
            FnDescriptor::new(vec![], TypeId::INT, StrToInt(str_len)),
        );
        reg.register(
            TypeId::STR,
            "IsEmpty",
            FnDescriptor::new(vec![], TypeId::BOOL, StrToBool(str_is_empty)),
        );

        let str_str_to_bool =
            |f| FnDescriptor::new(vec![TypeId::STR], TypeId::BOOL, StrStrToBool(f));
        reg.register(TypeId::STR, "Contains", str_str_to_bool(str_contains));
        reg.register(TypeId::STR, "StartsWith", str_str_to_bool(str_starts_with));
        reg.register(TypeId::STR, "EndsWith", str_str_to_bool(str_ends_with));

        reg.register(
            TypeId::STR,
            "Replace",
            FnDescriptor::new(
                vec![TypeId::STR, TypeId::STR],
                TypeId::STR,
                FnImpl::Generic(Arc::new(|args| {
                    let s = receiver(args)?.coerce_str();
                    let from = args.get(1).map(Value::coerce_str).unwrap_or_default();
                    let to = args.get(2).map(Value::coerce_str).unwrap_or_default();
                    Ok(Value::string(s.replace(&*from, &to)))
                })),
            ),
        );

        reg.register_for_tag(
            TypeTag::List,
            "Size",
            FnDescriptor::new(vec![], TypeId::INT, ListToInt(list_size)),
        );
        reg.register_for_tag(
            TypeTag::List,
            "First",
            FnDescriptor::elem_result(
                vec![],
                FnImpl::Generic(Arc::new(|args| {
                    let items = receiver(args)?.coerce_list();
                    Ok(items.first().cloned().unwrap_or(Value::Null))
                })),
            ),
        );
        reg.register_for_tag(
            TypeTag::List,
            "Last",
            FnDescriptor::elem_result(
                vec![],
                FnImpl::Generic(Arc::new(|args| {
                    let items = receiver(args)?.coerce_list();
                    Ok(items.last().cloned().unwrap_or(Value::Null))
                })),
            ),
        );

        reg.register_for_tag(
            TypeTag::Map,
            "Size",
            FnDescriptor::new(
                vec![],
                TypeId::INT,
                FnImpl::Generic(Arc::new(|args| {
                    let entries = receiver(args)?.coerce_map();
                    Ok(Value::int(clamp_len(entries.len())))
                })),
            ),
        );
        reg.register_for_tag(
            TypeTag::Map,
            "ContainsKey",
            FnDescriptor::new(
                vec![TypeId::STR],
                TypeId::BOOL,
                FnImpl::Generic(Arc::new(|args| {
                    let entries = receiver(args)?.coerce_map();
                    let key = args.get(1).map(Value::coerce_str).unwrap_or_default();
                    Ok(Value::Bool(entries.contains_key(&*key)))
                })),
            ),
        );
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn exact_lookup_finds_builtins() {
        let pool = TypePool::new();
        let reg = FnRegistry::with_builtins();

        let desc = reg.lookup(TypeId::STR, "Upper", &pool).unwrap();
        assert!(desc.args.is_empty());
        assert!(matches!(desc.result, ReturnType::Fixed(TypeId::STR)));

        assert!(reg.lookup(TypeId::STR, "Nope", &pool).is_none());
        assert!(reg.lookup(TypeId::INT, "Upper", &pool).is_none());
    }

    #[test]
    fn tag_lookup_covers_every_list_type() {
        let pool = TypePool::new();
        let reg = FnRegistry::with_builtins();

        let ints = pool.list_of(TypeId::INT);
        let strs = pool.list_of(TypeId::STR);
        assert!(reg.lookup(ints, "Size", &pool).is_some());
        assert!(reg.lookup(strs, "Size", &pool).is_some());

        let first = reg.lookup(ints, "First", &pool).unwrap();
        assert_eq!(first.result_type(ints, &pool), Some(TypeId::INT));
        assert_eq!(first.result_type(strs, &pool), Some(TypeId::STR));
    }

    #[test]
    fn exact_registration_shadows_tag() {
        let pool = TypePool::new();
        let mut reg = FnRegistry::with_builtins();
        let ints = pool.list_of(TypeId::INT);

        reg.register(
            ints,
            "Size",
            FnDescriptor::new(vec![], TypeId::STR, FnImpl::StrToStr(str::to_owned)),
        );
        let desc = reg.lookup(ints, "Size", &pool).unwrap();
        assert!(matches!(desc.result, ReturnType::Fixed(TypeId::STR)));
    }

    #[test]
    fn generic_impls_read_receiver_and_args() {
        let imp: GenericFn = Arc::new(|args| {
            let s = args
                .first()
                .ok_or_else(|| FnError::new("missing receiver"))?
                .coerce_str();
            Ok(Value::int(i64::try_from(s.len()).unwrap_or(i64::MAX)))
        });
        let out = imp(&[Value::string("four")]).unwrap();
        assert_eq!(out, Value::int(4));
    }
}
