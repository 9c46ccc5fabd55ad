//! Engine and plan handles.
//!
//! An [`Engine`] owns the shared compilation context: the type pool, the
//! string interner, the function registry, and the variable declarations
//! templates compile against. Engines are cheap to clone and safe to
//! share; each [`Engine::compile`] produces an independent [`Plan`].
//!
//! Plans are immutable and `Send + Sync`. All per-render mutation lives
//! in a [`RenderState`], so one plan can serve any number of threads as
//! long as each render brings its own state.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use velo_ir::{Name, StringInterner};
use velo_types::{TypeId, TypePool, TypePoolError, TypeTag};

use crate::buffer::Buffer;
use crate::compile::{Block, Planner};
use crate::error::CompileError;
use crate::registry::{FnDescriptor, FnRegistry};
use crate::schema::SchemaData;
use crate::state::{RenderState, StatePool};
use crate::subtemplate::SubCache;

/// Engine tuning knobs.
#[derive(Copy, Clone, Debug)]
pub struct EngineOptions {
    /// Initial output buffer capacity in bytes.
    pub buffer_size: usize,
    /// Sub-template cache entry ceiling. The cache clears wholesale when
    /// a compile would push it past this.
    pub eval_cache_ceiling: usize,
    /// HTML-escape interpolated values. Literal template text and
    /// unresolved-reference fallbacks pass through untouched either way.
    pub html_escape: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            buffer_size: 4096,
            eval_cache_ceiling: 64,
            html_escape: false,
        }
    }
}

/// An engine-level variable declaration, replayed into every plan.
#[derive(Copy, Clone, Debug)]
pub(crate) enum Declare {
    Var(Name, TypeId),
    Embed(TypeId),
}

/// State shared by an engine, its plans, and their compiled closures.
pub(crate) struct EngineShared {
    pub pool: Arc<TypePool>,
    pub interner: Arc<StringInterner>,
    pub registry: RwLock<FnRegistry>,
    pub options: EngineOptions,
    pub declares: Mutex<Vec<Declare>>,
}

/// Template compiler front end.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<EngineShared>,
}

impl Engine {
    pub fn new(options: EngineOptions, registry: FnRegistry) -> Self {
        Engine {
            shared: Arc::new(EngineShared {
                pool: Arc::new(TypePool::new()),
                interner: Arc::new(StringInterner::new()),
                registry: RwLock::new(registry),
                options,
                declares: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Default options and the builtin function set.
    pub fn with_defaults() -> Self {
        Engine::new(EngineOptions::default(), FnRegistry::with_builtins())
    }

    /// The engine's type pool, for declaring record and container types.
    pub fn types(&self) -> &TypePool {
        &self.shared.pool
    }

    /// The engine's string interner.
    pub fn names(&self) -> &StringInterner {
        &self.shared.interner
    }

    /// Declare a top-level variable visible to every later compile.
    pub fn define_variable(&self, name: &str, ty: TypeId) {
        let name = self.shared.interner.intern(name);
        self.shared.declares.lock().push(Declare::Var(name, ty));
    }

    /// Declare an embedded record: the record itself becomes a variable
    /// under its own name, and each of its fields doubles as a top-level
    /// selector.
    pub fn embed_variable(&self, ty: TypeId) -> Result<(), TypePoolError> {
        let target = self.shared.pool.deref(ty);
        if self.shared.pool.tag(target) != TypeTag::Record {
            return Err(TypePoolError::NotARecord(ty));
        }
        self.shared.declares.lock().push(Declare::Embed(ty));
        Ok(())
    }

    /// Register a function on an exact receiver type. Takes effect for
    /// compiles after this call; existing plans are unaffected.
    pub fn register_function(&self, receiver: TypeId, name: &str, descriptor: FnDescriptor) {
        self.shared.registry.write().register(receiver, name, descriptor);
    }

    /// Register a function on a whole type kind (all lists, all maps).
    pub fn register_tag_function(&self, tag: TypeTag, name: &str, descriptor: FnDescriptor) {
        self.shared
            .registry
            .write()
            .register_for_tag(tag, name, descriptor);
    }

    /// Compile a template into a reusable plan.
    pub fn compile(&self, source: &str) -> Result<Plan, CompileError> {
        let parsed = velo_parse::parse(source, &self.shared.interner)?;
        let declares: Arc<[Declare]> = {
            let snapshot = self.shared.declares.lock().clone();
            snapshot.into()
        };
        let mut planner = Planner::new(Arc::clone(&self.shared), &parsed.arena, declares);
        planner.apply_declares()?;
        let block = planner.compile_block(parsed.root)?;
        let (schema, cache) = planner.finish();
        tracing::debug!(
            statements = parsed.arena.stmt_count(),
            slots = schema.len(),
            "template compiled"
        );
        Ok(Plan {
            block,
            schema,
            cache,
            engine: Arc::clone(&self.shared),
        })
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<EngineShared> {
        &self.shared
    }
}

/// A compiled template, ready to render.
pub struct Plan {
    block: Block,
    schema: Arc<SchemaData>,
    cache: Arc<SubCache>,
    engine: Arc<EngineShared>,
}

impl Plan {
    /// Fresh render state with every slot at its type's zero.
    pub fn new_state(&self) -> RenderState {
        RenderState::new(
            Arc::clone(&self.schema),
            Arc::clone(&self.engine.pool),
            Arc::clone(&self.engine.interner),
            Buffer::new(self.engine.options.buffer_size),
        )
    }

    /// Bounded pool of pre-built states for concurrent rendering.
    pub fn state_pool(&self, size: usize) -> StatePool {
        StatePool::new((0..size).map(|_| self.new_state()).collect())
    }

    /// Run the plan against a state. Output accumulates in the state's
    /// buffer; call [`RenderState::reset`] between renders.
    pub fn exec(&self, state: &mut RenderState) {
        self.block.run(state);
    }

    /// Number of sub-template cache hits across all renders of this plan.
    pub fn eval_cache_hits(&self) -> u64 {
        self.cache.hits()
    }
}
