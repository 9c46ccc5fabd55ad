//! Velo type system: the type pool and runtime values.
//!
//! Types are interned in a [`TypePool`] and referenced everywhere by
//! [`TypeId`] (a u32 handle with O(1) equality). Runtime data is the closed
//! [`Value`] enum; plan compilation pairs statically-typed slots with typed
//! accessors so the render path never inspects variants it did not expect.

mod data;
mod pool;
mod type_id;
mod value;

pub use data::{FieldData, RecordData, TypeData, TypeTag};
pub use pool::{TypePool, TypePoolError};
pub use type_id::TypeId;
pub use value::{RecordValue, Value};
