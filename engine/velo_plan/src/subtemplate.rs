//! `#evaluate` support: compiling and caching sub-templates.
//!
//! A sub-template is a full plan compiled at render time from a string
//! value. Compiled plans are cached per parent plan, keyed by the exact
//! source text, so rendering the same text twice compiles once. The child
//! sees the parent's top-level variables: their names and types are
//! declared into the child schema at compile time, and their current
//! values are copied in at render time. Output goes straight into the
//! parent's buffer, loaned to the child for the duration of the run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::buffer::Buffer;
use crate::compile::{Block, Planner};
use crate::engine::{Declare, EngineShared};
use crate::error::CompileError;
use crate::schema::{SchemaData, SlotId};
use crate::state::RenderState;

/// A compiled sub-template.
pub(crate) struct SubPlan {
    block: Block,
    schema: Arc<SchemaData>,
    /// Parent slot to child slot, for every shared top-level variable.
    seeds: Vec<(SlotId, SlotId)>,
}

impl SubPlan {
    /// Render into the parent's buffer using a fresh child state.
    pub fn run(&self, parent: &mut RenderState, engine: &EngineShared) {
        let mut child = RenderState::new(
            Arc::clone(&self.schema),
            Arc::clone(&engine.pool),
            Arc::clone(&engine.interner),
            Buffer::new(engine.options.buffer_size),
        );
        for &(from, to) in &self.seeds {
            let value = parent.value(from).clone();
            child.set_raw(to, value);
        }
        std::mem::swap(parent.buffer(), child.buffer());
        self.block.run(&mut child);
        std::mem::swap(parent.buffer(), child.buffer());
    }
}

/// Per-plan cache of compiled sub-templates.
pub(crate) struct SubCache {
    plans: Mutex<FxHashMap<Arc<str>, Arc<SubPlan>>>,
    hits: AtomicU64,
    ceiling: usize,
    declares: Arc<[Declare]>,
}

impl SubCache {
    pub fn new(ceiling: usize, declares: Arc<[Declare]>) -> Self {
        SubCache {
            plans: Mutex::new(FxHashMap::default()),
            hits: AtomicU64::new(0),
            ceiling,
            declares,
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Fetch the plan for `text`, compiling it on first sight.
    ///
    /// The lock is held through compilation so concurrent renders of the
    /// same text compile once.
    pub fn lookup_or_compile(
        &self,
        text: &Arc<str>,
        engine: &Arc<EngineShared>,
        parent: &SchemaData,
    ) -> Result<Arc<SubPlan>, CompileError> {
        let mut plans = self.plans.lock();
        if let Some(sub) = plans.get(text) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(sub));
        }
        let sub = Arc::new(compile_sub(
            text,
            engine,
            Arc::clone(&self.declares),
            parent,
        )?);
        if plans.len() >= self.ceiling {
            tracing::trace!(
                entries = plans.len(),
                "evaluation cache ceiling reached, clearing"
            );
            plans.clear();
        }
        plans.insert(Arc::clone(text), Arc::clone(&sub));
        Ok(sub)
    }
}

/// Compile `text` as a child of the given parent schema.
///
/// Engine declarations replay first so embedded records splice their
/// fields; then every named parent slot is declared so the child resolves
/// the parent's variables and the seed table can map them across.
fn compile_sub(
    text: &str,
    engine: &Arc<EngineShared>,
    declares: Arc<[Declare]>,
    parent: &SchemaData,
) -> Result<SubPlan, CompileError> {
    tracing::debug!(bytes = text.len(), "compiling sub-template");
    let parsed = velo_parse::parse(text, &engine.interner)?;
    let mut planner = Planner::new(Arc::clone(engine), &parsed.arena, declares);
    planner.apply_declares()?;
    for &(name, ty, _) in parent.named() {
        planner.define_variable(name, ty)?;
    }
    let block = planner.compile_block(parsed.root)?;
    let (schema, _) = planner.finish();
    let seeds = schema
        .named()
        .iter()
        .filter_map(|&(name, _, child_slot)| {
            parent.slot_of(name).map(|parent_slot| (parent_slot, child_slot))
        })
        .collect();
    Ok(SubPlan {
        block,
        schema,
        seeds,
    })
}
