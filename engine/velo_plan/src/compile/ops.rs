//! Operator compilation.
//!
//! Every binary and unary site gets one anonymous accumulator slot. The
//! compiled run closure evaluates both sides and writes the result there;
//! the surrounding expression reads it back through a typed getter. Types
//! are settled here at compile time: `int` arithmetic stays `int`, mixed
//! `int`/`float` widens to `float`, and `+` on two strings concatenates.

use std::cmp::Ordering;
use std::sync::Arc;

use velo_ir::{BinaryOp, ExprId, UnaryOp};
use velo_types::TypeId;

use crate::error::CompileError;
use crate::operand::{Access, Operand, RunFn};
use crate::state::RenderState;

use super::Planner;

impl Planner<'_> {
    pub(crate) fn compile_binary(
        &mut self,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Result<Operand, CompileError> {
        let lhs = self.compile_expr(lhs)?;
        self.require_resolved(&lhs)?;
        let rhs = self.compile_expr(rhs)?;
        self.require_resolved(&rhs)?;
        if op.is_logical() {
            self.compile_logical(op, lhs, rhs)
        } else if op.is_comparison() {
            self.compile_comparison(op, lhs, rhs)
        } else {
            self.compile_arithmetic(op, lhs, rhs)
        }
    }

    /// `&&` and `||`, short-circuiting through the host operators.
    fn compile_logical(
        &mut self,
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    ) -> Result<Operand, CompileError> {
        if lhs.ty != TypeId::BOOL || rhs.ty != TypeId::BOOL {
            return Err(self.unsupported(op, &lhs, &rhs));
        }
        let slot = self.schema.accumulator(TypeId::BOOL);
        let a = lhs.bool_fn();
        let b = rhs.bool_fn();
        let run: RunFn = match op {
            BinaryOp::And => Arc::new(move |state: &mut RenderState| {
                let v = a(state) && b(state);
                state.set_bool(slot, v);
            }),
            _ => Arc::new(move |state: &mut RenderState| {
                let v = a(state) || b(state);
                state.set_bool(slot, v);
            }),
        };
        Ok(Operand::new(TypeId::BOOL, Access::Computed { run, slot }))
    }

    fn compile_comparison(
        &mut self,
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    ) -> Result<Operand, CompileError> {
        let slot = self.schema.accumulator(TypeId::BOOL);
        let run: RunFn = match (lhs.ty, rhs.ty) {
            (TypeId::INT, TypeId::INT) => {
                let f = int_cmp(op);
                let a = lhs.int_fn();
                let b = rhs.int_fn();
                Arc::new(move |state: &mut RenderState| {
                    let v = f(a(state), b(state));
                    state.set_bool(slot, v);
                })
            }
            (TypeId::FLOAT, TypeId::FLOAT)
            | (TypeId::INT, TypeId::FLOAT)
            | (TypeId::FLOAT, TypeId::INT) => {
                let f = float_cmp(op);
                let a = lhs.float_fn();
                let b = rhs.float_fn();
                Arc::new(move |state: &mut RenderState| {
                    let v = f(a(state), b(state));
                    state.set_bool(slot, v);
                })
            }
            (TypeId::STR, TypeId::STR) => {
                let f = str_cmp(op);
                let a = lhs.str_fn();
                let b = rhs.str_fn();
                Arc::new(move |state: &mut RenderState| {
                    let va = a(state);
                    let vb = b(state);
                    let v = f(&va, &vb);
                    state.set_bool(slot, v);
                })
            }
            (TypeId::BOOL, TypeId::BOOL) if matches!(op, BinaryOp::Eq | BinaryOp::NotEq) => {
                let a = lhs.bool_fn();
                let b = rhs.bool_fn();
                if op == BinaryOp::Eq {
                    Arc::new(move |state: &mut RenderState| {
                        let v = a(state) == b(state);
                        state.set_bool(slot, v);
                    })
                } else {
                    Arc::new(move |state: &mut RenderState| {
                        let v = a(state) != b(state);
                        state.set_bool(slot, v);
                    })
                }
            }
            _ => return Err(self.unsupported(op, &lhs, &rhs)),
        };
        Ok(Operand::new(TypeId::BOOL, Access::Computed { run, slot }))
    }

    fn compile_arithmetic(
        &mut self,
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    ) -> Result<Operand, CompileError> {
        match (lhs.ty, rhs.ty) {
            (TypeId::INT, TypeId::INT) => {
                let slot = self.schema.accumulator(TypeId::INT);
                let f = int_arith(op);
                let a = lhs.int_fn();
                let b = rhs.int_fn();
                let run: RunFn = Arc::new(move |state: &mut RenderState| {
                    let v = f(a(state), b(state));
                    state.set_int(slot, v);
                });
                Ok(Operand::new(TypeId::INT, Access::Computed { run, slot }))
            }
            (TypeId::FLOAT, TypeId::FLOAT)
            | (TypeId::INT, TypeId::FLOAT)
            | (TypeId::FLOAT, TypeId::INT) => {
                let slot = self.schema.accumulator(TypeId::FLOAT);
                let f = float_arith(op);
                let a = lhs.float_fn();
                let b = rhs.float_fn();
                let run: RunFn = Arc::new(move |state: &mut RenderState| {
                    let v = f(a(state), b(state));
                    state.set_float(slot, v);
                });
                Ok(Operand::new(TypeId::FLOAT, Access::Computed { run, slot }))
            }
            (TypeId::STR, TypeId::STR) if op == BinaryOp::Add => {
                let slot = self.schema.accumulator(TypeId::STR);
                let a = lhs.str_fn();
                let b = rhs.str_fn();
                let run: RunFn = Arc::new(move |state: &mut RenderState| {
                    let va = a(state);
                    let vb = b(state);
                    let mut out = String::with_capacity(va.len() + vb.len());
                    out.push_str(&va);
                    out.push_str(&vb);
                    state.set_str(slot, out);
                });
                Ok(Operand::new(TypeId::STR, Access::Computed { run, slot }))
            }
            _ => Err(self.unsupported(op, &lhs, &rhs)),
        }
    }

    pub(crate) fn compile_not(
        &mut self,
        op: UnaryOp,
        operand: ExprId,
    ) -> Result<Operand, CompileError> {
        let inner = self.compile_expr(operand)?;
        self.require_resolved(&inner)?;
        if inner.ty != TypeId::BOOL {
            return Err(CompileError::UnsupportedOperation {
                op: op.as_symbol(),
                operands: self.type_name(inner.ty),
            });
        }
        let slot = self.schema.accumulator(TypeId::BOOL);
        let get = inner.bool_fn();
        let run: RunFn = Arc::new(move |state: &mut RenderState| {
            let v = !get(state);
            state.set_bool(slot, v);
        });
        Ok(Operand::new(TypeId::BOOL, Access::Computed { run, slot }))
    }

    fn unsupported(&self, op: BinaryOp, lhs: &Operand, rhs: &Operand) -> CompileError {
        CompileError::UnsupportedOperation {
            op: op.as_symbol(),
            operands: format!("{} and {}", self.type_name(lhs.ty), self.type_name(rhs.ty)),
        }
    }
}

fn int_cmp(op: BinaryOp) -> fn(i64, i64) -> bool {
    match op {
        BinaryOp::Eq => |a, b| a == b,
        BinaryOp::NotEq => |a, b| a != b,
        BinaryOp::Lt => |a, b| a < b,
        BinaryOp::LtEq => |a, b| a <= b,
        BinaryOp::Gt => |a, b| a > b,
        BinaryOp::GtEq => |a, b| a >= b,
        other => panic!("not a comparison: {other:?}"),
    }
}

fn float_cmp(op: BinaryOp) -> fn(f64, f64) -> bool {
    match op {
        BinaryOp::Eq => |a, b| a.partial_cmp(&b) == Some(Ordering::Equal),
        BinaryOp::NotEq => |a, b| a.partial_cmp(&b) != Some(Ordering::Equal),
        BinaryOp::Lt => |a, b| a < b,
        BinaryOp::LtEq => |a, b| a <= b,
        BinaryOp::Gt => |a, b| a > b,
        BinaryOp::GtEq => |a, b| a >= b,
        other => panic!("not a comparison: {other:?}"),
    }
}

fn str_cmp(op: BinaryOp) -> fn(&str, &str) -> bool {
    match op {
        BinaryOp::Eq => |a, b| a == b,
        BinaryOp::NotEq => |a, b| a != b,
        BinaryOp::Lt => |a, b| a < b,
        BinaryOp::LtEq => |a, b| a <= b,
        BinaryOp::Gt => |a, b| a > b,
        BinaryOp::GtEq => |a, b| a >= b,
        other => panic!("not a comparison: {other:?}"),
    }
}

fn int_arith(op: BinaryOp) -> fn(i64, i64) -> i64 {
    match op {
        BinaryOp::Add => |a, b| a + b,
        BinaryOp::Sub => |a, b| a - b,
        BinaryOp::Mul => |a, b| a * b,
        BinaryOp::Div => |a, b| a / b,
        other => panic!("not arithmetic: {other:?}"),
    }
}

fn float_arith(op: BinaryOp) -> fn(f64, f64) -> f64 {
    match op {
        BinaryOp::Add => |a, b| a + b,
        BinaryOp::Sub => |a, b| a - b,
        BinaryOp::Mul => |a, b| a * b,
        BinaryOp::Div => |a, b| a / b,
        other => panic!("not arithmetic: {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn int_division_truncates_toward_zero() {
        let div = int_arith(BinaryOp::Div);
        assert_eq!(div(7, 2), 3);
        assert_eq!(div(-7, 2), -3);
    }

    #[test]
    fn float_equality_treats_nan_as_unequal() {
        let eq = float_cmp(BinaryOp::Eq);
        let ne = float_cmp(BinaryOp::NotEq);
        assert!(eq(1.5, 1.5));
        assert!(!eq(f64::NAN, f64::NAN));
        assert!(ne(f64::NAN, f64::NAN));
    }

    #[test]
    fn string_ordering_is_lexicographic() {
        let lt = str_cmp(BinaryOp::Lt);
        assert!(lt("abc", "abd"));
        assert!(!lt("b", "a"));
    }
}
