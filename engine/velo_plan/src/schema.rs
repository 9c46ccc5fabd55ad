//! Arena schema.
//!
//! The schema is the compile-time layout of a render state's value arena:
//! an append-only list of typed slots. Named slots are top-level template
//! variables; anonymous slots are accumulators for intermediate expression
//! results. Slots are addressed by [`SlotId`] and never move or disappear
//! once allocated.

use rustc_hash::FxHashMap;
use velo_ir::Name;
use velo_types::{TypeId, TypePool, Value};

/// Index of a value slot in the render arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub(crate) struct SlotId(u32);

impl SlotId {
    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct SlotDecl {
    /// `Name::EMPTY` for accumulators.
    name: Name,
    ty: TypeId,
}

/// Mutable schema used during plan compilation.
pub(crate) struct ArenaSchema {
    slots: Vec<SlotDecl>,
    by_name: FxHashMap<Name, SlotId>,
}

impl ArenaSchema {
    pub fn new() -> Self {
        ArenaSchema {
            slots: Vec::new(),
            by_name: FxHashMap::default(),
        }
    }

    fn push(&mut self, name: Name, ty: TypeId) -> SlotId {
        let raw = u32::try_from(self.slots.len())
            .unwrap_or_else(|_| panic!("too many arena slots (over u32::MAX)"));
        self.slots.push(SlotDecl { name, ty });
        SlotId(raw)
    }

    /// Define a named top-level slot. Defining an existing name returns
    /// its slot unchanged.
    pub fn define(&mut self, name: Name, ty: TypeId) -> SlotId {
        if let Some(&slot) = self.by_name.get(&name) {
            return slot;
        }
        let slot = self.push(name, ty);
        self.by_name.insert(name, slot);
        slot
    }

    /// Allocate an anonymous accumulator slot.
    pub fn accumulator(&mut self, ty: TypeId) -> SlotId {
        self.push(Name::EMPTY, ty)
    }

    pub fn lookup(&self, name: Name) -> Option<SlotId> {
        self.by_name.get(&name).copied()
    }

    pub fn slot_type(&self, slot: SlotId) -> TypeId {
        self.slots[slot.index()].ty
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Freeze into the immutable per-plan schema, precomputing each
    /// slot's zero value.
    pub fn finish(&self, pool: &TypePool) -> SchemaData {
        let types: Vec<TypeId> = self.slots.iter().map(|s| s.ty).collect();
        let zeros: Vec<Value> = types.iter().map(|&ty| pool.zero_value(ty)).collect();
        let named: Vec<(Name, TypeId, SlotId)> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.name != Name::EMPTY)
            .map(|(i, s)| {
                #[expect(clippy::cast_possible_truncation, reason = "slot count checked at push")]
                let slot = SlotId(i as u32);
                (s.name, s.ty, slot)
            })
            .collect();
        SchemaData {
            types,
            zeros,
            by_name: self.by_name.clone(),
            named,
        }
    }
}

/// Frozen schema shared by a plan and its render states.
pub(crate) struct SchemaData {
    types: Vec<TypeId>,
    zeros: Vec<Value>,
    by_name: FxHashMap<Name, SlotId>,
    /// Named slots in declaration order; these seed sub-template plans.
    named: Vec<(Name, TypeId, SlotId)>,
}

impl SchemaData {
    pub fn slot_of(&self, name: Name) -> Option<SlotId> {
        self.by_name.get(&name).copied()
    }

    pub fn slot_type(&self, slot: SlotId) -> TypeId {
        self.types[slot.index()]
    }

    /// Fresh arena contents: one zero value per slot.
    pub fn zeros(&self) -> &[Value] {
        &self.zeros
    }

    pub fn named(&self) -> &[(Name, TypeId, SlotId)] {
        &self.named
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }
}
