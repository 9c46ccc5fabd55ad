//! Velo plan compiler and execution engine.
//!
//! This crate turns parsed templates into execution plans: closure trees
//! over a pre-laid-out value arena. An [`Engine`] carries the shared
//! compilation context (type pool, interner, function registry, variable
//! declarations); [`Engine::compile`] resolves every reference, fixes
//! every slot and access path, and specializes every operation at compile
//! time, so rendering is a straight walk of prebuilt closures with no
//! per-render lookups.
//!
//! A [`Plan`] is immutable and `Send + Sync`; all per-render mutation
//! lives in a [`RenderState`]. Typical use:
//!
//! ```
//! use velo_plan::{Engine, TypeId, Value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::with_defaults();
//! engine.define_variable("name", TypeId::STR);
//!
//! let plan = engine.compile("Hello, $name!")?;
//! let mut state = plan.new_state();
//! state.set_value("name", Value::string("world"))?;
//! plan.exec(&mut state);
//! assert_eq!(state.output(), "Hello, world!");
//! # Ok(())
//! # }
//! ```

mod buffer;
mod compile;
mod cycle;
mod engine;
mod error;
mod operand;
mod registry;
mod schema;
mod selector;
mod state;
mod subtemplate;

pub use engine::{Engine, EngineOptions, Plan};
pub use error::{CompileError, FnError, ParseError, StateError};
pub use registry::{FnDescriptor, FnImpl, FnRegistry, GenericFn, ReturnType};
pub use state::{RenderState, StatePool};

pub use velo_ir::{Name, StringInterner};
pub use velo_types::{
    FieldData, RecordValue, TypeId, TypePool, TypePoolError, TypeTag, Value,
};
