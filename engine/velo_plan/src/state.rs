//! Per-render execution state and the bounded state pool.

use parking_lot::Mutex;
use std::sync::Arc;

use velo_ir::StringInterner;
use velo_types::{TypePool, Value};

use crate::buffer::Buffer;
use crate::error::StateError;
use crate::schema::{SchemaData, SlotId};

/// One render's worth of mutable state: a value arena laid out by the
/// plan's schema, plus the output buffer.
///
/// A state is single-render: share the [`Plan`](crate::Plan), not the
/// state. Use one state per concurrent render, or borrow from a
/// [`StatePool`].
pub struct RenderState {
    values: Vec<Value>,
    buffer: Buffer,
    schema: Arc<SchemaData>,
    pool: Arc<TypePool>,
    interner: Arc<StringInterner>,
}

impl RenderState {
    pub(crate) fn new(
        schema: Arc<SchemaData>,
        pool: Arc<TypePool>,
        interner: Arc<StringInterner>,
        buffer: Buffer,
    ) -> Self {
        RenderState {
            values: schema.zeros().to_vec(),
            buffer,
            schema,
            pool,
            interner,
        }
    }

    /// Write a top-level variable before rendering.
    ///
    /// The value must fit the variable's declared type; a `Null` clears
    /// record and container variables but is rejected for scalars.
    pub fn set_value(&mut self, name: &str, value: Value) -> Result<(), StateError> {
        let id = self.interner.intern(name);
        let Some(slot) = self.schema.slot_of(id) else {
            return Err(StateError::UnknownVariable {
                name: name.to_owned(),
            });
        };
        let ty = self.schema.slot_type(slot);
        if !value.fits(&self.pool, ty) {
            return Err(StateError::TypeMismatch {
                name: name.to_owned(),
                expected: self.pool.display(ty, &self.interner),
                found: value.kind_name().to_owned(),
            });
        }
        self.values[slot.index()] = value;
        Ok(())
    }

    /// Rewind the output buffer, keeping its capacity. Slot values are
    /// left as-is; callers overwrite inputs through [`set_value`] before
    /// the next render.
    ///
    /// [`set_value`]: RenderState::set_value
    pub fn reset(&mut self) {
        self.buffer.reset();
    }

    /// The rendered output so far.
    pub fn output(&self) -> &str {
        self.buffer.as_str()
    }

    /// Take the rendered output, leaving the buffer empty.
    pub fn take_output(&mut self) -> String {
        self.buffer.take()
    }

    pub(crate) fn schema(&self) -> &Arc<SchemaData> {
        &self.schema
    }

    pub(crate) fn buffer(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    pub(crate) fn value(&self, slot: SlotId) -> &Value {
        &self.values[slot.index()]
    }

    pub(crate) fn set_raw(&mut self, slot: SlotId, value: Value) {
        self.values[slot.index()] = value;
    }

    pub(crate) fn int(&self, slot: SlotId) -> i64 {
        self.values[slot.index()].coerce_int()
    }

    pub(crate) fn float(&self, slot: SlotId) -> f64 {
        self.values[slot.index()].coerce_float()
    }

    pub(crate) fn bool(&self, slot: SlotId) -> bool {
        self.values[slot.index()].coerce_bool()
    }

    pub(crate) fn str(&self, slot: SlotId) -> Arc<str> {
        self.values[slot.index()].coerce_str()
    }

    pub(crate) fn set_int(&mut self, slot: SlotId, v: i64) {
        self.values[slot.index()] = Value::Int(v);
    }

    pub(crate) fn set_float(&mut self, slot: SlotId, v: f64) {
        self.values[slot.index()] = Value::Float(v);
    }

    pub(crate) fn set_bool(&mut self, slot: SlotId, v: bool) {
        self.values[slot.index()] = Value::Bool(v);
    }

    pub(crate) fn set_str(&mut self, slot: SlotId, v: impl Into<Arc<str>>) {
        self.values[slot.index()] = Value::Str(v.into());
    }
}

/// Bounded pool of reusable render states.
///
/// `acquire` busy-polls until a state is free; `release` rewinds the
/// state's buffer and hands it back. States keep their arena allocation
/// and buffer capacity across borrows.
pub struct StatePool {
    states: Mutex<Vec<RenderState>>,
}

impl StatePool {
    pub(crate) fn new(states: Vec<RenderState>) -> Self {
        StatePool {
            states: Mutex::new(states),
        }
    }

    /// Borrow a state, waiting until one is free.
    pub fn acquire(&self) -> RenderState {
        loop {
            if let Some(state) = self.states.lock().pop() {
                return state;
            }
            std::thread::yield_now();
        }
    }

    /// Return a borrowed state to the pool.
    pub fn release(&self, mut state: RenderState) {
        state.reset();
        self.states.lock().push(state);
    }
}
