//! Compilation and render-state errors.

use thiserror::Error;

pub use velo_parse::ParseError;

/// Error from compiling a template into a plan.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The source failed to lex or parse.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A reference's root name is undefined where a value is required.
    #[error("unresolved reference `${path}`")]
    UnresolvedSelector { path: String },

    /// A field selector path was declared twice (embedding collision).
    #[error("duplicate selector path `{path}`")]
    DuplicateSelector { path: String },

    /// Field access on a type that has no such field.
    #[error("type `{ty}` has no field `{field}`")]
    UnknownField { ty: String, field: String },

    /// An operator applied to types it is not defined for.
    #[error("operator `{op}` not supported for {operands}")]
    UnsupportedOperation {
        op: &'static str,
        operands: String,
    },

    /// Assignment with a value whose type differs from the variable's.
    #[error("cannot assign `{found}` to `{name}` of type `{expected}`")]
    AssignTypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    /// `#set` target that is not a bare variable.
    #[error("assignment target must be a variable")]
    UnsupportedAssignTarget,

    /// Function call with no registered function for the receiver type.
    #[error("no function `{name}` on `{receiver}`")]
    UndefinedFunction { receiver: String, name: String },

    /// Function call with the wrong number of arguments.
    #[error("function `{name}` takes {expected} arguments, got {found}")]
    WrongArgCount {
        name: String,
        expected: usize,
        found: usize,
    },

    /// Function argument whose type differs from the declared one.
    #[error("argument {index} of `{name}` must be `{expected}`, got `{found}`")]
    ArgTypeMismatch {
        name: String,
        index: usize,
        expected: String,
        found: String,
    },

    /// Range literal with a non-literal bound.
    #[error("range bounds must be integer literals")]
    NonLiteralRangeBound,

    /// `#foreach` source or index base that is not a sequence.
    #[error("`{ty}` is not a sequence")]
    NotASequence { ty: String },

    /// `#evaluate` argument that is not a string.
    #[error("#evaluate argument must be a string, got `{ty}`")]
    NotAString { ty: String },

    /// `#if` or `#for` condition that is not boolean.
    #[error("condition must be boolean, got `{ty}`")]
    NonBoolCondition { ty: String },
}

/// Error from writing a variable into a render state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// The name is not a declared top-level variable of the plan.
    #[error("unknown variable `{name}`")]
    UnknownVariable { name: String },

    /// The value's shape does not fit the variable's declared type.
    #[error("value of kind `{found}` does not fit variable `{name}` of type `{expected}`")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },
}

/// Error raised by a generic registered function at render time.
///
/// A failing call faults the render, matching out-of-bounds access and
/// the other fatal render conditions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct FnError {
    message: String,
}

impl FnError {
    pub fn new(message: impl Into<String>) -> Self {
        FnError {
            message: message.into(),
        }
    }
}
