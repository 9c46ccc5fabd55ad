//! Selector table.
//!
//! Selectors are the compile-time resolution graph for field paths. Each
//! top-level variable gets a root selector carrying its arena slot; record
//! fields below it are expanded eagerly into child selectors, interned by
//! fully-qualified path (`user.Address.City`). Expansion stops when a
//! record type recurs on its own path; paths beyond that point resolve
//! lazily on first use.
//!
//! Function-call and index segments are not interned here: they are bound
//! per call site by the expression compiler, so two calls with different
//! arguments never share state.

use rustc_hash::FxHashMap;
use velo_ir::{Name, StringInterner};
use velo_types::{TypeId, TypePool};

use crate::cycle::CycleGuard;
use crate::error::CompileError;
use crate::schema::SlotId;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub(crate) struct SelectorId(u32);

impl SelectorId {
    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A resolved path segment.
#[derive(Debug)]
pub(crate) struct Selector {
    /// Fully-qualified path, interned.
    pub path: Name,
    pub ty: TypeId,
    pub parent: Option<SelectorId>,
    /// Arena slot; roots only.
    pub slot: Option<SlotId>,
    /// Positional index within the parent record; fields only.
    pub field_index: Option<u32>,
}

pub(crate) struct SelectorTable {
    selectors: Vec<Selector>,
    by_path: FxHashMap<Name, SelectorId>,
}

impl SelectorTable {
    pub fn new() -> Self {
        SelectorTable {
            selectors: Vec::new(),
            by_path: FxHashMap::default(),
        }
    }

    pub fn get(&self, id: SelectorId) -> &Selector {
        &self.selectors[id.index()]
    }

    pub fn lookup_path(&self, path: Name) -> Option<SelectorId> {
        self.by_path.get(&path).copied()
    }

    fn push(&mut self, selector: Selector) -> SelectorId {
        let raw = u32::try_from(self.selectors.len())
            .unwrap_or_else(|_| panic!("too many selectors (over u32::MAX)"));
        let id = SelectorId(raw);
        self.by_path.insert(selector.path, id);
        self.selectors.push(selector);
        id
    }

    fn child_path(&self, parent: SelectorId, name: Name, interner: &StringInterner) -> Name {
        let parent_path = interner.lookup(self.get(parent).path);
        let segment = interner.lookup(name);
        interner.intern(&format!("{parent_path}.{segment}"))
    }

    /// Define a top-level root and eagerly expand record fields below it.
    /// Re-defining an existing name is a no-op.
    pub fn define_root(
        &mut self,
        name: Name,
        ty: TypeId,
        slot: SlotId,
        pool: &TypePool,
        interner: &StringInterner,
    ) -> Result<SelectorId, CompileError> {
        if let Some(id) = self.lookup_path(name) {
            return Ok(id);
        }
        let id = self.push(Selector {
            path: name,
            ty,
            parent: None,
            slot: Some(slot),
            field_index: None,
        });
        let mut guard = CycleGuard::new();
        self.expand(id, &mut guard, pool, interner)?;
        Ok(id)
    }

    /// Recursively pre-expand the record fields below `parent`.
    fn expand(
        &mut self,
        parent: SelectorId,
        guard: &mut CycleGuard,
        pool: &TypePool,
        interner: &StringInterner,
    ) -> Result<(), CompileError> {
        let parent_ty = pool.deref(self.get(parent).ty);
        let Some(fields) = pool.record_fields(parent_ty) else {
            return Ok(());
        };
        if !guard.enter(parent_ty) {
            tracing::trace!(
                path = %interner.lookup(self.get(parent).path),
                "cyclic record type, stopping eager expansion"
            );
            return Ok(());
        }
        for (index, field) in fields.iter().enumerate() {
            let path = self.child_path(parent, field.name, interner);
            let child = self.insert_field(parent, path, field.ty, index, interner)?;
            self.expand(child, guard, pool, interner)?;
        }
        guard.exit();
        Ok(())
    }

    fn insert_field(
        &mut self,
        parent: SelectorId,
        path: Name,
        ty: TypeId,
        index: usize,
        interner: &StringInterner,
    ) -> Result<SelectorId, CompileError> {
        if self.by_path.contains_key(&path) {
            return Err(CompileError::DuplicateSelector {
                path: interner.lookup(path).to_string(),
            });
        }
        let field_index = u32::try_from(index)
            .unwrap_or_else(|_| panic!("record field index over u32::MAX"));
        Ok(self.push(Selector {
            path,
            ty,
            parent: Some(parent),
            slot: None,
            field_index: Some(field_index),
        }))
    }

    /// Splice the fields of `root`'s record type in as top-level names.
    /// Each field surfaces under its rename; collisions with existing
    /// paths are duplicate-selector errors.
    pub fn splice_fields(
        &mut self,
        root: SelectorId,
        pool: &TypePool,
        interner: &StringInterner,
    ) -> Result<(), CompileError> {
        let root_ty = pool.deref(self.get(root).ty);
        let Some(fields) = pool.record_fields(root_ty) else {
            return Ok(());
        };
        let mut guard = CycleGuard::new();
        guard.enter(root_ty);
        for (index, field) in fields.iter().enumerate() {
            let child = self.insert_field(root, field.rename, field.ty, index, interner)?;
            tracing::trace!(
                name = %interner.lookup(field.rename),
                "spliced record field as top-level selector"
            );
            self.expand(child, &mut guard, pool, interner)?;
        }
        Ok(())
    }

    /// Resolve `parent.name`, creating the selector on demand when the
    /// eager pass stopped at a cycle.
    pub fn resolve_child(
        &mut self,
        parent: SelectorId,
        name: Name,
        pool: &TypePool,
        interner: &StringInterner,
    ) -> Result<SelectorId, CompileError> {
        let path = self.child_path(parent, name, interner);
        if let Some(id) = self.lookup_path(path) {
            return Ok(id);
        }
        let parent_ty = pool.deref(self.get(parent).ty);
        let Some((index, field)) = pool.record_field(parent_ty, name) else {
            return Err(CompileError::UnknownField {
                ty: pool.display(parent_ty, interner),
                field: interner.lookup(name).to_string(),
            });
        };
        tracing::trace!(
            path = %interner.lookup(path),
            "resolved selector past expansion cutoff"
        );
        self.insert_field(parent, path, field.ty, index, interner)
    }

    /// Root slot and field-index hops for a field-path selector,
    /// outermost hop first.
    pub fn chain_to(&self, id: SelectorId) -> (SlotId, Vec<u32>) {
        let mut hops = Vec::new();
        let mut cur = id;
        loop {
            let sel = self.get(cur);
            let (Some(parent), Some(index)) = (sel.parent, sel.field_index) else {
                break;
            };
            hops.push(index);
            cur = parent;
        }
        let Some(slot) = self.get(cur).slot else {
            panic!("selector root without arena slot");
        };
        hops.reverse();
        (slot, hops)
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }
}
