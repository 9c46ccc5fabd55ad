//! Velo IR - Shared Representation Types
//!
//! This crate contains the core data structures shared across the Velo
//! template engine:
//! - Spans for source locations
//! - Names for interned identifiers and literals
//! - Tokens and `TokenList` for lexer output
//! - Flat AST nodes (Expr, Stmt) with arena allocation
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: Strings → Name(u32)
//! - **Flatten Everything**: No Box<Expr>, use ExprId(u32) indices
//!
//! Types that contain floats store them as u64 bits for Hash compatibility.
//! Types that contain strings use interned Name for O(1) equality.

pub mod ast;
mod interner;
mod name;
mod span;
mod token;

pub use ast::{
    BinaryOp, Expr, ExprId, ExprKind, ExprRange, Stmt, StmtId, StmtKind, StmtRange, TemplateArena,
    UnaryOp,
};
pub use interner::{InternError, StringInterner};
pub use name::Name;
pub use span::{Span, SpanError};
pub use token::{Token, TokenKind, TokenList};
