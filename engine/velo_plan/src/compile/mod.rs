//! Plan compiler.
//!
//! The [`Planner`] owns the arena schema and the selector table while it
//! walks a parsed template, turning every statement into a [`StepFn`]
//! closure. Compilation and schema growth are interleaved: a `#foreach`
//! registers its loop variable before its body compiles, an assignment to
//! an undeclared name defines the name with the right-hand type, and each
//! binary or unary expression site gets one anonymous accumulator slot.
//!
//! Closures only capture owned data (slots, names, `Arc`s), so a finished
//! [`Block`] has no ties to the AST arena and can be shared across
//! threads for the life of the plan.

mod expr;
mod ops;

use smallvec::SmallVec;
use std::fmt;
use std::sync::{Arc, OnceLock};

use velo_ir::{ExprId, ExprKind, Name, StmtId, StmtKind, StmtRange, TemplateArena};
use velo_types::{TypeId, TypeTag};

use crate::engine::{Declare, EngineShared};
use crate::error::CompileError;
use crate::operand::{Access, Operand, StepFn};
use crate::schema::{ArenaSchema, SchemaData, SlotId};
use crate::selector::SelectorTable;
use crate::state::RenderState;
use crate::subtemplate::SubCache;

/// Handle to a plan's schema, filled in when compilation finishes.
///
/// Closures that must consult the complete schema (bare references that a
/// later assignment may still define) capture this instead of a snapshot.
pub(crate) type LateSchema = Arc<OnceLock<Arc<SchemaData>>>;

/// A compiled statement sequence.
///
/// Small blocks keep their steps inline; longer ones spill to the heap.
/// Either way execution is a plain in-order walk.
pub(crate) struct Block {
    steps: SmallVec<[StepFn; 4]>,
}

impl Block {
    fn new() -> Self {
        Block {
            steps: SmallVec::new(),
        }
    }

    fn push(&mut self, step: StepFn) {
        self.steps.push(step);
    }

    pub fn run(&self, state: &mut RenderState) {
        for step in &self.steps {
            step(state);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({} steps)", self.steps.len())
    }
}

/// Single-template compiler state.
pub(crate) struct Planner<'c> {
    engine: Arc<EngineShared>,
    arena: &'c TemplateArena,
    declares: Arc<[Declare]>,
    schema: ArenaSchema,
    selectors: SelectorTable,
    late: LateSchema,
    cache: Arc<SubCache>,
}

impl<'c> Planner<'c> {
    pub fn new(engine: Arc<EngineShared>, arena: &'c TemplateArena, declares: Arc<[Declare]>) -> Self {
        let cache = Arc::new(SubCache::new(
            engine.options.eval_cache_ceiling,
            Arc::clone(&declares),
        ));
        Planner {
            engine,
            arena,
            declares,
            schema: ArenaSchema::new(),
            selectors: SelectorTable::new(),
            late: Arc::new(OnceLock::new()),
            cache,
        }
    }

    /// Replay the engine-level declarations into this plan's schema.
    pub fn apply_declares(&mut self) -> Result<(), CompileError> {
        let declares = Arc::clone(&self.declares);
        for decl in declares.iter() {
            match *decl {
                Declare::Var(name, ty) => {
                    self.define_variable(name, ty)?;
                }
                Declare::Embed(ty) => self.embed_variable(ty)?,
            }
        }
        Ok(())
    }

    /// Declare a top-level variable: one arena slot plus a selector root
    /// with its record fields pre-expanded. Idempotent per name.
    pub fn define_variable(&mut self, name: Name, ty: TypeId) -> Result<SlotId, CompileError> {
        let slot = self.schema.define(name, ty);
        self.selectors
            .define_root(name, ty, slot, &self.engine.pool, &self.engine.interner)?;
        Ok(slot)
    }

    /// Declare an embedded record: a root slot under the record's own
    /// name, with every field spliced in as a top-level selector.
    pub fn embed_variable(&mut self, ty: TypeId) -> Result<(), CompileError> {
        let target = self.engine.pool.deref(ty);
        let Some(name) = self.engine.pool.record_name(target) else {
            panic!("embedded variable must be a record type");
        };
        let slot = self.schema.define(name, ty);
        let root = self
            .selectors
            .define_root(name, ty, slot, &self.engine.pool, &self.engine.interner)?;
        self.selectors
            .splice_fields(root, &self.engine.pool, &self.engine.interner)
    }

    pub fn compile_block(&mut self, range: StmtRange) -> Result<Block, CompileError> {
        let arena = self.arena;
        let mut block = Block::new();
        for &stmt in arena.stmt_list(range) {
            self.compile_stmt(stmt, &mut block)?;
        }
        Ok(block)
    }

    /// Freeze the schema and publish it to the late handle.
    pub fn finish(self) -> (Arc<SchemaData>, Arc<SubCache>) {
        let schema = Arc::new(self.schema.finish(&self.engine.pool));
        if self.late.set(Arc::clone(&schema)).is_err() {
            panic!("plan schema finalized twice");
        }
        (schema, self.cache)
    }

    fn compile_stmt(&mut self, id: StmtId, block: &mut Block) -> Result<(), CompileError> {
        let arena = self.arena;
        match arena.stmt(id).kind {
            StmtKind::Text(text) => {
                let text = self.engine.interner.lookup(text);
                block.push(Box::new(move |state: &mut RenderState| {
                    state.buffer().push_str(&text);
                }));
            }
            StmtKind::Emit { expr, raw } => self.compile_emit(expr, raw, block)?,
            StmtKind::Set { target, value } => {
                let step = self.compile_set(target, value)?;
                block.push(step);
            }
            StmtKind::If { .. } => {
                let step = self.compile_if(id)?;
                block.push(step);
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                let step = self.compile_for(init, cond, post, body)?;
                block.push(step);
            }
            StmtKind::ForEach {
                item,
                index,
                source,
                body,
            } => {
                let step = self.compile_foreach(item, index, source, body)?;
                block.push(step);
            }
            StmtKind::Evaluate { arg } => {
                let step = self.compile_evaluate(arg)?;
                block.push(step);
            }
        }
        Ok(())
    }

    /// Bare reference at text level: `$x`.
    ///
    /// Typed and resolved operands get a type-specific formatter. A bare
    /// undefined name stays open until render, because an assignment
    /// later in the template may still define it; a dotted path with an
    /// undefined root can never resolve and always falls back to its
    /// literal source text.
    fn compile_emit(&mut self, expr: ExprId, raw: Name, block: &mut Block) -> Result<(), CompileError> {
        let op = self.compile_expr(expr)?;
        let escape = self.engine.options.html_escape;
        if let Some(name) = op.unresolved() {
            let literal = self.engine.interner.lookup(raw);
            if matches!(op.access, Access::Missing(_)) {
                tracing::debug!(reference = %literal, "unresolved reference renders as literal text");
                block.push(Box::new(move |state: &mut RenderState| {
                    state.buffer().push_str(&literal);
                }));
            } else {
                let late = Arc::clone(&self.late);
                block.push(Box::new(move |state: &mut RenderState| {
                    let slot = late.get().and_then(|schema| schema.slot_of(name));
                    match slot {
                        Some(slot) => {
                            let value = state.value(slot).clone();
                            if escape {
                                let text = value.to_string();
                                state.buffer().push_escaped(&text);
                            } else {
                                state.buffer().push_display(&value);
                            }
                        }
                        None => state.buffer().push_str(&literal),
                    }
                }));
            }
            return Ok(());
        }
        block.push(emit_step(op, escape));
        Ok(())
    }

    /// `#set($name = expr)`.
    ///
    /// The right-hand side compiles first so its type is known. Assigning
    /// to an undeclared name defines it with that type; re-assigning an
    /// existing name requires the exact declared type, with no coercion.
    fn compile_set(&mut self, target: ExprId, value: ExprId) -> Result<StepFn, CompileError> {
        let arena = self.arena;
        let rhs = self.compile_expr(value)?;
        self.require_resolved(&rhs)?;
        let ExprKind::Var(name) = arena.expr(target).kind else {
            return Err(CompileError::UnsupportedAssignTarget);
        };
        let slot = match self.schema.lookup(name) {
            Some(slot) => {
                let expected = self.schema.slot_type(slot);
                if expected != rhs.ty {
                    return Err(CompileError::AssignTypeMismatch {
                        name: self.engine.interner.lookup(name).to_string(),
                        expected: self.type_name(expected),
                        found: self.type_name(rhs.ty),
                    });
                }
                slot
            }
            None => self.define_variable(name, rhs.ty)?,
        };
        Ok(copy_step(rhs, slot))
    }

    /// One link of an `#if`/`#elseif`/`#else` chain, compiled in source
    /// order: condition, body, then the chained alternative.
    fn compile_if(&mut self, id: StmtId) -> Result<StepFn, CompileError> {
        let arena = self.arena;
        let StmtKind::If { cond, body, alt } = arena.stmt(id).kind else {
            panic!("expected an if statement");
        };
        if !cond.is_valid() {
            // Bare #else: unconditional tail of the chain.
            let body = self.compile_block(body)?;
            return Ok(Box::new(move |state: &mut RenderState| body.run(state)));
        }
        let cond_op = self.compile_expr(cond)?;
        self.require_resolved(&cond_op)?;
        if cond_op.ty != TypeId::BOOL {
            return Err(CompileError::NonBoolCondition {
                ty: self.type_name(cond_op.ty),
            });
        }
        let test = cond_op.bool_fn();
        let body = self.compile_block(body)?;
        let alt_step = if alt.is_valid() {
            Some(self.compile_if(alt)?)
        } else {
            None
        };
        Ok(Box::new(move |state: &mut RenderState| {
            if test(state) {
                body.run(state);
            } else if let Some(alt) = &alt_step {
                alt(state);
            }
        }))
    }

    /// `#for(init; cond; post)`. The init clause compiles first so a loop
    /// variable it introduces is visible to the condition and body.
    fn compile_for(
        &mut self,
        init: StmtId,
        cond: ExprId,
        post: StmtId,
        body: StmtRange,
    ) -> Result<StepFn, CompileError> {
        let init_step = self.compile_set_stmt(init)?;
        let cond_op = self.compile_expr(cond)?;
        self.require_resolved(&cond_op)?;
        if cond_op.ty != TypeId::BOOL {
            return Err(CompileError::NonBoolCondition {
                ty: self.type_name(cond_op.ty),
            });
        }
        let test = cond_op.bool_fn();
        let post_step = self.compile_set_stmt(post)?;
        let body = self.compile_block(body)?;
        Ok(Box::new(move |state: &mut RenderState| {
            init_step(state);
            while test(state) {
                body.run(state);
                post_step(state);
            }
        }))
    }

    fn compile_set_stmt(&mut self, id: StmtId) -> Result<StepFn, CompileError> {
        let arena = self.arena;
        let StmtKind::Set { target, value } = arena.stmt(id).kind else {
            panic!("for-loop clause must be an assignment");
        };
        self.compile_set(target, value)
    }

    /// `#foreach($item in source)`, with an optional index binding.
    ///
    /// The loop variables are ordinary top-level arena slots, registered
    /// before the body compiles so the body resolves them like any other
    /// name.
    fn compile_foreach(
        &mut self,
        item: Name,
        index: Name,
        source: ExprId,
        body: StmtRange,
    ) -> Result<StepFn, CompileError> {
        let source_op = self.compile_expr(source)?;
        self.require_resolved(&source_op)?;
        let src_ty = self.engine.pool.deref(source_op.ty);
        if self.engine.pool.tag(src_ty) != TypeTag::List {
            return Err(CompileError::NotASequence {
                ty: self.type_name(source_op.ty),
            });
        }
        let Some(elem_ty) = self.engine.pool.elem_of(src_ty) else {
            panic!("list type without an element type");
        };
        let item_slot = self.define_variable(item, elem_ty)?;
        let index_slot = if index.is_empty() {
            None
        } else {
            Some(self.define_variable(index, TypeId::INT)?)
        };
        let body = self.compile_block(body)?;
        let get = source_op.value_fn();
        Ok(Box::new(move |state: &mut RenderState| {
            let items = get(state).coerce_list();
            let mut at = 0i64;
            for item in items.iter() {
                state.set_raw(item_slot, item.clone());
                if let Some(slot) = index_slot {
                    state.set_int(slot, at);
                }
                body.run(state);
                at += 1;
            }
        }))
    }

    /// `#evaluate(expr)`: render the string value as a sub-template.
    fn compile_evaluate(&mut self, arg: ExprId) -> Result<StepFn, CompileError> {
        let op = self.compile_expr(arg)?;
        self.require_resolved(&op)?;
        if op.ty != TypeId::STR {
            return Err(CompileError::NotAString {
                ty: self.type_name(op.ty),
            });
        }
        let get = op.str_fn();
        let engine = Arc::clone(&self.engine);
        let cache = Arc::clone(&self.cache);
        Ok(Box::new(move |state: &mut RenderState| {
            let text = get(state);
            let sub = match cache.lookup_or_compile(&text, &engine, state.schema()) {
                Ok(sub) => sub,
                Err(err) => {
                    tracing::warn!(error = %err, "sub-template failed to compile, rendering nothing");
                    return;
                }
            };
            sub.run(state, &engine);
        }))
    }

    pub(crate) fn require_resolved(&self, op: &Operand) -> Result<(), CompileError> {
        match op.unresolved() {
            Some(name) => Err(CompileError::UnresolvedSelector {
                path: self.engine.interner.lookup(name).to_string(),
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn type_name(&self, ty: TypeId) -> String {
        self.engine.pool.display(ty, &self.engine.interner)
    }
}

/// Type-specialized output step for a resolved operand.
fn emit_step(op: Operand, escape: bool) -> StepFn {
    match op.ty {
        TypeId::INT => {
            let get = op.int_fn();
            Box::new(move |state: &mut RenderState| {
                let v = get(state);
                state.buffer().push_display(v);
            })
        }
        TypeId::FLOAT => {
            let get = op.float_fn();
            Box::new(move |state: &mut RenderState| {
                let v = get(state);
                state.buffer().push_display(v);
            })
        }
        TypeId::BOOL => {
            let get = op.bool_fn();
            Box::new(move |state: &mut RenderState| {
                let v = get(state);
                state.buffer().push_display(v);
            })
        }
        TypeId::STR => {
            let get = op.str_fn();
            if escape {
                Box::new(move |state: &mut RenderState| {
                    let v = get(state);
                    state.buffer().push_escaped(&v);
                })
            } else {
                Box::new(move |state: &mut RenderState| {
                    let v = get(state);
                    state.buffer().push_str(&v);
                })
            }
        }
        _ => {
            let get = op.value_fn();
            if escape {
                Box::new(move |state: &mut RenderState| {
                    let text = get(state).to_string();
                    state.buffer().push_escaped(&text);
                })
            } else {
                Box::new(move |state: &mut RenderState| {
                    let value = get(state);
                    state.buffer().push_display(&value);
                })
            }
        }
    }
}

/// Type-specialized copy step for an assignment.
fn copy_step(rhs: Operand, slot: SlotId) -> StepFn {
    match rhs.ty {
        TypeId::INT => {
            let get = rhs.int_fn();
            Box::new(move |state: &mut RenderState| {
                let v = get(state);
                state.set_int(slot, v);
            })
        }
        TypeId::FLOAT => {
            let get = rhs.float_fn();
            Box::new(move |state: &mut RenderState| {
                let v = get(state);
                state.set_float(slot, v);
            })
        }
        TypeId::BOOL => {
            let get = rhs.bool_fn();
            Box::new(move |state: &mut RenderState| {
                let v = get(state);
                state.set_bool(slot, v);
            })
        }
        TypeId::STR => {
            let get = rhs.str_fn();
            Box::new(move |state: &mut RenderState| {
                let v = get(state);
                state.set_str(slot, v);
            })
        }
        _ => {
            let get = rhs.value_fn();
            Box::new(move |state: &mut RenderState| {
                let v = get(state);
                state.set_raw(slot, v);
            })
        }
    }
}
