//! Expression compilation.
//!
//! Literals become constants, operators go through the accumulator path
//! in [`ops`](super::ops), and references are walked segment by segment:
//! interned field paths flatten to a root slot plus field-index hops,
//! while call and index segments bind closures at the site where they
//! appear. A reference whose root is not declared compiles to an open
//! operand instead of an error, so bare output can fall back to literal
//! text.

use std::sync::Arc;

use velo_ir::{ExprId, ExprKind, ExprRange, Name};
use velo_types::{TypeId, TypeTag, Value};

use crate::error::CompileError;
use crate::operand::{Access, CallFn, Chain, ChainStart, Hop, Operand, StrFn, ValueFn};
use crate::registry::FnImpl;
use crate::selector::SelectorId;
use crate::state::RenderState;

use super::Planner;

/// Where a reference walk currently stands.
enum RefCursor {
    /// Still on the interned selector graph.
    Path(SelectorId),
    /// Left the graph: a chain start plus the hops collected so far.
    Flow {
        start: ChainStart,
        hops: Vec<Hop>,
        ty: TypeId,
    },
    /// Root name not declared. `dotted` marks whether any segment
    /// followed the root; a dotted path can never resolve later.
    Unknown { root: Name, dotted: bool },
}

impl Planner<'_> {
    pub(crate) fn compile_expr(&mut self, id: ExprId) -> Result<Operand, CompileError> {
        let arena = self.arena;
        match arena.expr(id).kind {
            ExprKind::Int(v) => Ok(Operand::constant(TypeId::INT, Value::Int(v))),
            ExprKind::Float(bits) => Ok(Operand::constant(
                TypeId::FLOAT,
                Value::Float(ExprKind::float_value(bits)),
            )),
            ExprKind::Bool(v) => Ok(Operand::constant(TypeId::BOOL, Value::Bool(v))),
            ExprKind::Str(name) => Ok(Operand::constant(
                TypeId::STR,
                Value::Str(self.engine.interner.lookup(name)),
            )),
            ExprKind::Paren(inner) => self.compile_expr(inner),
            ExprKind::Binary { op, lhs, rhs } => self.compile_binary(op, lhs, rhs),
            ExprKind::Unary { op, operand } => self.compile_not(op, operand),
            ExprKind::Range { lo, hi } => self.compile_range(lo, hi),
            ExprKind::Var(_)
            | ExprKind::Field { .. }
            | ExprKind::Call { .. }
            | ExprKind::Index { .. } => self.compile_reference(id),
        }
    }

    fn compile_reference(&mut self, id: ExprId) -> Result<Operand, CompileError> {
        match self.walk_reference(id)? {
            RefCursor::Path(sel) => {
                let (ty, parent, slot) = {
                    let sel = self.selectors.get(sel);
                    (sel.ty, sel.parent, sel.slot)
                };
                if parent.is_none() {
                    let Some(slot) = slot else {
                        panic!("root selector without an arena slot");
                    };
                    return Ok(Operand::new(ty, Access::Slot(slot)));
                }
                let (slot, indices) = self.selectors.chain_to(sel);
                let hops = indices.into_iter().map(Hop::Field).collect();
                Ok(self.chain_operand(ChainStart::Slot(slot), hops, ty))
            }
            RefCursor::Flow { start, hops, ty } => Ok(self.chain_operand(start, hops, ty)),
            RefCursor::Unknown { root, dotted } => {
                let access = if dotted {
                    Access::Missing(root)
                } else {
                    Access::Deferred(root)
                };
                Ok(Operand::new(TypeId::UNKNOWN, access))
            }
        }
    }

    fn chain_operand(&self, start: ChainStart, hops: Vec<Hop>, ty: TypeId) -> Operand {
        let pool = &self.engine.pool;
        let zero = pool.zero_value(pool.deref(ty));
        Operand::new(
            ty,
            Access::Chain(Chain {
                start,
                hops: Arc::from(hops),
                zero,
            }),
        )
    }

    fn walk_reference(&mut self, id: ExprId) -> Result<RefCursor, CompileError> {
        let arena = self.arena;
        match arena.expr(id).kind {
            ExprKind::Var(name) => Ok(match self.selectors.lookup_path(name) {
                Some(sel) => RefCursor::Path(sel),
                None => RefCursor::Unknown {
                    root: name,
                    dotted: false,
                },
            }),
            ExprKind::Field { base, name } => match self.walk_reference(base)? {
                RefCursor::Path(parent) => {
                    let sel = self.selectors.resolve_child(
                        parent,
                        name,
                        &self.engine.pool,
                        &self.engine.interner,
                    )?;
                    Ok(RefCursor::Path(sel))
                }
                RefCursor::Unknown { root, .. } => Ok(RefCursor::Unknown { root, dotted: true }),
                cursor => {
                    let (start, mut hops, ty) = self.cursor_flow(cursor);
                    let target = self.engine.pool.deref(ty);
                    let Some((index, field)) = self.engine.pool.record_field(target, name) else {
                        return Err(CompileError::UnknownField {
                            ty: self.type_name(ty),
                            field: self.engine.interner.lookup(name).to_string(),
                        });
                    };
                    let index = u32::try_from(index)
                        .unwrap_or_else(|_| panic!("record field index over u32::MAX"));
                    hops.push(Hop::Field(index));
                    Ok(RefCursor::Flow {
                        start,
                        hops,
                        ty: field.ty,
                    })
                }
            },
            ExprKind::Call { base, name, args } => match self.walk_reference(base)? {
                RefCursor::Unknown { root, .. } => Ok(RefCursor::Unknown { root, dotted: true }),
                cursor => {
                    let (start, mut hops, ty) = self.cursor_flow(cursor);
                    let (hop, result) = self.build_call_hop(ty, name, args)?;
                    hops.push(hop);
                    Ok(RefCursor::Flow {
                        start,
                        hops,
                        ty: result,
                    })
                }
            },
            ExprKind::Index { base, index } => match self.walk_reference(base)? {
                RefCursor::Unknown { root, .. } => Ok(RefCursor::Unknown { root, dotted: true }),
                cursor => {
                    let (start, mut hops, ty) = self.cursor_flow(cursor);
                    let target = self.engine.pool.deref(ty);
                    let tag = self.engine.pool.tag(target);
                    match tag {
                        TypeTag::List => {
                            let op = self.compile_expr(index)?;
                            self.require_resolved(&op)?;
                            if op.ty != TypeId::INT {
                                return Err(self.index_error(ty, &op, "indexed by"));
                            }
                            let Some(elem) = self.engine.pool.elem_of(target) else {
                                panic!("list type without an element type");
                            };
                            hops.push(Hop::Index(op.int_fn()));
                            Ok(RefCursor::Flow {
                                start,
                                hops,
                                ty: elem,
                            })
                        }
                        TypeTag::Map => {
                            let op = self.compile_expr(index)?;
                            self.require_resolved(&op)?;
                            if op.ty != TypeId::STR {
                                return Err(self.index_error(ty, &op, "keyed by"));
                            }
                            let Some(elem) = self.engine.pool.elem_of(target) else {
                                panic!("map type without a value type");
                            };
                            hops.push(Hop::Key(op.str_fn()));
                            Ok(RefCursor::Flow {
                                start,
                                hops,
                                ty: elem,
                            })
                        }
                        _ => Err(CompileError::NotASequence {
                            ty: self.type_name(ty),
                        }),
                    }
                }
            },
            // Anything else as a receiver: compile it whole and start the
            // chain from its value.
            _ => {
                let op = self.compile_expr(id)?;
                self.require_resolved(&op)?;
                let ty = op.ty;
                Ok(RefCursor::Flow {
                    start: ChainStart::Op(op.value_fn()),
                    hops: Vec::new(),
                    ty,
                })
            }
        }
    }

    /// Lower a cursor to chain parts. `Unknown` never reaches here; every
    /// caller routes it through its own arm first.
    fn cursor_flow(&self, cursor: RefCursor) -> (ChainStart, Vec<Hop>, TypeId) {
        match cursor {
            RefCursor::Path(sel) => {
                let ty = self.selectors.get(sel).ty;
                let (slot, indices) = self.selectors.chain_to(sel);
                let hops = indices.into_iter().map(Hop::Field).collect();
                (ChainStart::Slot(slot), hops, ty)
            }
            RefCursor::Flow { start, hops, ty } => (start, hops, ty),
            RefCursor::Unknown { .. } => panic!("cursor on an unresolved reference"),
        }
    }

    /// Bind `receiver.Name(args)` to a call hop.
    ///
    /// The descriptor is cloned out of the registry so the read lock
    /// drops before argument compilation, which may recurse into further
    /// lookups.
    fn build_call_hop(
        &mut self,
        receiver: TypeId,
        name: Name,
        args: ExprRange,
    ) -> Result<(Hop, TypeId), CompileError> {
        let arena = self.arena;
        let fn_name = self.engine.interner.lookup(name);
        let target = self.engine.pool.deref(receiver);
        let Some(desc) = self
            .engine
            .registry
            .read()
            .lookup(target, &fn_name, &self.engine.pool)
            .cloned()
        else {
            return Err(CompileError::UndefinedFunction {
                receiver: self.type_name(receiver),
                name: fn_name.to_string(),
            });
        };
        let arg_ids = arena.expr_list(args);
        if arg_ids.len() != desc.args.len() {
            return Err(CompileError::WrongArgCount {
                name: fn_name.to_string(),
                expected: desc.args.len(),
                found: arg_ids.len(),
            });
        }
        let mut arg_ops = Vec::with_capacity(arg_ids.len());
        for (index, (&arg, &expected)) in arg_ids.iter().zip(&desc.args).enumerate() {
            let op = self.compile_expr(arg)?;
            self.require_resolved(&op)?;
            if op.ty != expected {
                return Err(CompileError::ArgTypeMismatch {
                    name: fn_name.to_string(),
                    index,
                    expected: self.type_name(expected),
                    found: self.type_name(op.ty),
                });
            }
            arg_ops.push(op);
        }
        let Some(result) = desc.result_type(receiver, &self.engine.pool) else {
            panic!("function result type failed to resolve");
        };
        Ok((Hop::Call(call_closure(desc.imp, arg_ops)), result))
    }

    /// `[lo...hi]`: an inclusive integer range materialized as a constant
    /// list, counting down when `lo > hi`.
    fn compile_range(&mut self, lo: ExprId, hi: ExprId) -> Result<Operand, CompileError> {
        let a = self.range_bound(lo)?;
        let b = self.range_bound(hi)?;
        let items: Vec<Value> = if a <= b {
            (a..=b).map(Value::int).collect()
        } else {
            (b..=a).rev().map(Value::int).collect()
        };
        let ty = self.engine.pool.list_of(TypeId::INT);
        Ok(Operand::constant(ty, Value::list(items)))
    }

    fn range_bound(&self, id: ExprId) -> Result<i64, CompileError> {
        match self.arena.expr(id).kind {
            ExprKind::Int(v) => Ok(v),
            ExprKind::Paren(inner) => self.range_bound(inner),
            _ => Err(CompileError::NonLiteralRangeBound),
        }
    }

    fn index_error(&self, receiver: TypeId, index: &Operand, how: &'static str) -> CompileError {
        CompileError::UnsupportedOperation {
            op: "[]",
            operands: format!(
                "{} {how} {}",
                self.type_name(receiver),
                self.type_name(index.ty)
            ),
        }
    }
}

/// Closure for one call site. Argument getters bind here; the receiver
/// flows in from the chain at render time.
fn call_closure(imp: FnImpl, args: Vec<Operand>) -> CallFn {
    match imp {
        FnImpl::StrToStr(f) => Arc::new(move |value: Value, _: &mut RenderState| {
            Value::string(f(&value.coerce_str()))
        }),
        FnImpl::StrToInt(f) => Arc::new(move |value: Value, _: &mut RenderState| {
            Value::Int(f(&value.coerce_str()))
        }),
        FnImpl::StrToBool(f) => Arc::new(move |value: Value, _: &mut RenderState| {
            Value::Bool(f(&value.coerce_str()))
        }),
        FnImpl::StrStrToBool(f) => {
            let get = one_str_arg(args);
            Arc::new(move |value: Value, state: &mut RenderState| {
                let arg = get(state);
                Value::Bool(f(&value.coerce_str(), &arg))
            })
        }
        FnImpl::StrStrToStr(f) => {
            let get = one_str_arg(args);
            Arc::new(move |value: Value, state: &mut RenderState| {
                let arg = get(state);
                Value::string(f(&value.coerce_str(), &arg))
            })
        }
        FnImpl::ListToInt(f) => Arc::new(move |value: Value, _: &mut RenderState| {
            Value::Int(f(&value.coerce_list()))
        }),
        FnImpl::Generic(imp) => {
            let gets: Vec<ValueFn> = args.into_iter().map(Operand::value_fn).collect();
            Arc::new(move |value: Value, state: &mut RenderState| {
                let mut argv = Vec::with_capacity(gets.len() + 1);
                argv.push(value);
                for get in &gets {
                    argv.push(get(state));
                }
                match imp(&argv) {
                    Ok(result) => result,
                    Err(err) => panic!("function call failed: {err}"),
                }
            })
        }
    }
}

fn one_str_arg(mut args: Vec<Operand>) -> StrFn {
    let Some(op) = args.pop() else {
        panic!("arity checked before binding");
    };
    op.str_fn()
}
