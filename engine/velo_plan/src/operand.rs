//! Typed operands.
//!
//! Every compiled expression becomes an [`Operand`]: a static type plus a
//! way to obtain the value at render time. Consumers pick a typed getter
//! (`int_fn`, `str_fn`, ...) once at compile time, so the render path never
//! switches on a value's runtime kind.

use std::sync::Arc;

use velo_ir::Name;
use velo_types::{TypeId, Value};

use crate::schema::SlotId;
use crate::state::RenderState;

/// One executable statement. Boxed, owned by its block.
pub(crate) type StepFn = Box<dyn Fn(&mut RenderState) + Send + Sync>;

/// A computation run for its slot write.
pub(crate) type RunFn = Arc<dyn Fn(&mut RenderState) + Send + Sync>;

pub(crate) type IntFn = Arc<dyn Fn(&mut RenderState) -> i64 + Send + Sync>;
pub(crate) type FloatFn = Arc<dyn Fn(&mut RenderState) -> f64 + Send + Sync>;
pub(crate) type BoolFn = Arc<dyn Fn(&mut RenderState) -> bool + Send + Sync>;
pub(crate) type StrFn = Arc<dyn Fn(&mut RenderState) -> Arc<str> + Send + Sync>;
pub(crate) type ValueFn = Arc<dyn Fn(&mut RenderState) -> Value + Send + Sync>;

/// A compiled function invocation: receiver in, result out.
pub(crate) type CallFn = Arc<dyn Fn(Value, &mut RenderState) -> Value + Send + Sync>;

/// One step along a reference chain.
#[derive(Clone)]
pub(crate) enum Hop {
    /// Record field by positional index.
    Field(u32),
    /// Registered function call on the current value.
    Call(CallFn),
    /// List element. Out-of-range indices fault the render.
    Index(IntFn),
    /// Map entry. Missing keys read as Null.
    Key(StrFn),
}

impl Hop {
    fn apply(&self, value: Value, state: &mut RenderState) -> Value {
        match self {
            Hop::Field(index) => match value.as_record() {
                Some(rv) => rv.fields[*index as usize].clone(),
                None => Value::Null,
            },
            Hop::Call(call) => call(value, state),
            Hop::Index(index) => {
                let items = value.coerce_list();
                let raw = index(state);
                let Ok(at) = usize::try_from(raw) else {
                    panic!("list index {raw} out of range");
                };
                match items.get(at) {
                    Some(item) => item.clone(),
                    None => panic!("list index {raw} out of range (len {})", items.len()),
                }
            }
            Hop::Key(key) => {
                let entries = value.coerce_map();
                let key = key(state);
                entries.get(&*key).cloned().unwrap_or(Value::Null)
            }
        }
    }
}

/// Where a chain begins.
#[derive(Clone)]
pub(crate) enum ChainStart {
    Slot(SlotId),
    /// Computed receiver (parenthesized expression, literal, call result).
    Op(ValueFn),
}

/// A compiled reference chain: a start, hops to apply in order, and the
/// zero value of the final type. A Null anywhere along the walk yields
/// that zero instead of faulting.
#[derive(Clone)]
pub(crate) struct Chain {
    pub start: ChainStart,
    pub hops: Arc<[Hop]>,
    pub zero: Value,
}

impl Chain {
    pub fn eval(&self, state: &mut RenderState) -> Value {
        let mut cur = match &self.start {
            ChainStart::Slot(slot) => state.value(*slot).clone(),
            ChainStart::Op(run) => run(state),
        };
        for hop in self.hops.iter() {
            if cur.is_null() {
                return self.zero.clone();
            }
            cur = hop.apply(cur, state);
        }
        if cur.is_null() {
            return self.zero.clone();
        }
        cur
    }
}

/// How an operand's value is obtained at render time.
pub(crate) enum Access {
    /// Literal fixed at compile time.
    Const(Value),
    /// Direct arena slot read.
    Slot(SlotId),
    /// Reference chain walk.
    Chain(Chain),
    /// Run a computation that writes `slot`, then read it back.
    Computed { run: RunFn, slot: SlotId },
    /// Bare name not declared anywhere yet. Settled against the finished
    /// schema when the plan starts rendering.
    Deferred(Name),
    /// Path whose root never resolves. Emitted as literal text.
    Missing(Name),
}

/// A compiled expression: its static type and its access path.
pub(crate) struct Operand {
    pub ty: TypeId,
    pub access: Access,
}

impl Operand {
    pub fn new(ty: TypeId, access: Access) -> Self {
        Operand { ty, access }
    }

    pub fn constant(ty: TypeId, value: Value) -> Self {
        Operand {
            ty,
            access: Access::Const(value),
        }
    }

    /// The unresolved root name, if this operand never resolved.
    pub fn unresolved(&self) -> Option<Name> {
        match self.access {
            Access::Deferred(name) | Access::Missing(name) => Some(name),
            _ => None,
        }
    }

    pub fn int_fn(self) -> IntFn {
        match self.access {
            Access::Const(value) => {
                let v = value.coerce_int();
                Arc::new(move |_: &mut RenderState| v)
            }
            Access::Slot(slot) => Arc::new(move |state: &mut RenderState| state.int(slot)),
            Access::Chain(chain) => {
                Arc::new(move |state: &mut RenderState| chain.eval(state).coerce_int())
            }
            Access::Computed { run, slot } => Arc::new(move |state: &mut RenderState| {
                run(state);
                state.int(slot)
            }),
            Access::Deferred(_) | Access::Missing(_) => {
                unreachable!("unresolved reference survived compilation")
            }
        }
    }

    pub fn float_fn(self) -> FloatFn {
        match self.access {
            Access::Const(value) => {
                let v = value.coerce_float();
                Arc::new(move |_: &mut RenderState| v)
            }
            Access::Slot(slot) => Arc::new(move |state: &mut RenderState| state.float(slot)),
            Access::Chain(chain) => {
                Arc::new(move |state: &mut RenderState| chain.eval(state).coerce_float())
            }
            Access::Computed { run, slot } => Arc::new(move |state: &mut RenderState| {
                run(state);
                state.float(slot)
            }),
            Access::Deferred(_) | Access::Missing(_) => {
                unreachable!("unresolved reference survived compilation")
            }
        }
    }

    pub fn bool_fn(self) -> BoolFn {
        match self.access {
            Access::Const(value) => {
                let v = value.coerce_bool();
                Arc::new(move |_: &mut RenderState| v)
            }
            Access::Slot(slot) => Arc::new(move |state: &mut RenderState| state.bool(slot)),
            Access::Chain(chain) => {
                Arc::new(move |state: &mut RenderState| chain.eval(state).coerce_bool())
            }
            Access::Computed { run, slot } => Arc::new(move |state: &mut RenderState| {
                run(state);
                state.bool(slot)
            }),
            Access::Deferred(_) | Access::Missing(_) => {
                unreachable!("unresolved reference survived compilation")
            }
        }
    }

    pub fn str_fn(self) -> StrFn {
        match self.access {
            Access::Const(value) => {
                let v = value.coerce_str();
                Arc::new(move |_: &mut RenderState| v.clone())
            }
            Access::Slot(slot) => Arc::new(move |state: &mut RenderState| state.str(slot)),
            Access::Chain(chain) => {
                Arc::new(move |state: &mut RenderState| chain.eval(state).coerce_str())
            }
            Access::Computed { run, slot } => Arc::new(move |state: &mut RenderState| {
                run(state);
                state.str(slot)
            }),
            Access::Deferred(_) | Access::Missing(_) => {
                unreachable!("unresolved reference survived compilation")
            }
        }
    }

    pub fn value_fn(self) -> ValueFn {
        match self.access {
            Access::Const(value) => Arc::new(move |_: &mut RenderState| value.clone()),
            Access::Slot(slot) => {
                Arc::new(move |state: &mut RenderState| state.value(slot).clone())
            }
            Access::Chain(chain) => Arc::new(move |state: &mut RenderState| chain.eval(state)),
            Access::Computed { run, slot } => Arc::new(move |state: &mut RenderState| {
                run(state);
                state.value(slot).clone()
            }),
            Access::Deferred(_) | Access::Missing(_) => {
                unreachable!("unresolved reference survived compilation")
            }
        }
    }
}
