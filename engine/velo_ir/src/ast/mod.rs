//! Template AST
//!
//! Flat, index-based AST for parsed templates. Expressions and statements
//! live in parallel vectors inside [`TemplateArena`]; nodes refer to each
//! other through [`ExprId`]/[`StmtId`] indices instead of boxed pointers,
//! and child lists are contiguous ranges into flat ID vectors.

mod operators;

pub use operators::{BinaryOp, UnaryOp};

use crate::{Name, Span};
use std::fmt;

fn to_u32(v: usize, what: &str) -> u32 {
    u32::try_from(v).unwrap_or_else(|_| panic!("too many {what} (over u32::MAX)"))
}

fn to_u16(v: usize, what: &str) -> u16 {
    u16::try_from(v).unwrap_or_else(|_| panic!("{what} too long (over u16::MAX entries)"))
}

/// Macro to define u32 ID types for arena-allocated nodes.
macro_rules! define_id {
    ($($name:ident),* $(,)?) => { $(
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Sentinel for "no node".
            pub const INVALID: Self = Self(u32::MAX);

            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub const fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", stringify!($name), self.0)
                } else {
                    write!(f, "{}(INVALID)", stringify!($name))
                }
            }
        }
    )* };
}

define_id!(ExprId, StmtId);

/// Macro to define range types into the arena's flat ID lists.
///
/// Each generated type has:
/// - `start: u32` and `len: u16` fields
/// - `EMPTY` constant
/// - `new()`, `is_empty()`, `len()` methods
macro_rules! define_range {
    ($($name:ident),* $(,)?) => { $(
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
        #[repr(C)]
        pub struct $name {
            pub start: u32,
            pub len: u16,
        }

        impl $name {
            pub const EMPTY: Self = Self { start: 0, len: 0 };

            #[inline]
            pub const fn new(start: u32, len: u16) -> Self {
                Self { start, len }
            }

            #[inline]
            pub const fn is_empty(&self) -> bool {
                self.len == 0
            }

            #[inline]
            pub const fn len(&self) -> usize {
                self.len as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    "{}({}..{})",
                    stringify!($name),
                    self.start,
                    self.start + u32::from(self.len)
                )
            }
        }
    )* };
}

define_range!(ExprRange, StmtRange);

/// Expression node kinds.
///
/// All variants are `Copy`: children are `ExprId` indices, strings are
/// interned `Name`s, and float literals store bits for Eq/Hash.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ExprKind {
    /// Integer literal (negation already folded by the parser).
    Int(i64),
    /// Float literal stored as bits.
    Float(u64),
    /// Boolean literal.
    Bool(bool),
    /// String literal (interned, escapes resolved).
    Str(Name),
    /// Root variable reference: `$name`.
    Var(Name),
    /// Field access: `base.name`.
    Field { base: ExprId, name: Name },
    /// Method call: `base.name(args)`.
    Call {
        base: ExprId,
        name: Name,
        args: ExprRange,
    },
    /// Collection access: `base[index]`.
    Index { base: ExprId, index: ExprId },
    /// Binary operation.
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// Unary operation.
    Unary { op: UnaryOp, operand: ExprId },
    /// Parenthesized expression. Kept as a node so spans survive; the
    /// compiler passes straight through it.
    Paren(ExprId),
    /// Literal integer range `[lo...hi]`, inclusive on both ends.
    Range { lo: ExprId, hi: ExprId },
}

impl ExprKind {
    /// Float literal helper: recover the value from stored bits.
    #[inline]
    pub fn float_value(bits: u64) -> f64 {
        f64::from_bits(bits)
    }
}

/// An expression with its source span.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    #[inline]
    pub const fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

/// Statement node kinds.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum StmtKind {
    /// Raw template text, emitted verbatim.
    Text(Name),
    /// Reference output: `$expr` at text level. `raw` is the original
    /// source text of the reference, kept for the unresolved fallback.
    Emit { expr: ExprId, raw: Name },
    /// `#set($target = value)`. Also used for `#for` init/post clauses.
    Set { target: ExprId, value: ExprId },
    /// One link of an `#if`/`#elseif`/`#else` chain.
    ///
    /// `cond` is `ExprId::INVALID` for a bare `#else`; `alt` points at the
    /// next link and is `StmtId::INVALID` at the end of the chain.
    If {
        cond: ExprId,
        body: StmtRange,
        alt: StmtId,
    },
    /// `#for(init; cond; post)` loop. `init` and `post` are `Set` nodes.
    For {
        init: StmtId,
        cond: ExprId,
        post: StmtId,
        body: StmtRange,
    },
    /// `#foreach($item in source)`; `index` is `Name::EMPTY` unless the
    /// two-binding form `#foreach($item, $idx in source)` was used.
    ForEach {
        item: Name,
        index: Name,
        source: ExprId,
        body: StmtRange,
    },
    /// `#evaluate(arg)`: renders the string value of `arg` as a template.
    Evaluate { arg: ExprId },
}

/// A statement with its source span.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    #[inline]
    pub const fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }
}

/// Arena for template AST nodes.
///
/// # Index Spaces
///
/// - `exprs`: indexed by [`ExprId`]
/// - `stmts`: indexed by [`StmtId`]
/// - `expr_lists`: flat `Vec<ExprId>` indexed by [`ExprRange`] (call args)
/// - `stmt_lists`: flat `Vec<StmtId>` indexed by [`StmtRange`] (blocks)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateArena {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    expr_lists: Vec<ExprId>,
    stmt_lists: Vec<StmtId>,
}

impl TemplateArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an arena pre-allocated based on source length.
    ///
    /// Heuristic: ~1 node per 20 bytes of source.
    pub fn with_capacity(source_len: usize) -> Self {
        let estimated = source_len / 20;
        TemplateArena {
            exprs: Vec::with_capacity(estimated),
            stmts: Vec::with_capacity(estimated),
            expr_lists: Vec::new(),
            stmt_lists: Vec::new(),
        }
    }

    /// Allocate an expression, returning its ID.
    pub fn push_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::new(to_u32(self.exprs.len(), "expressions"));
        self.exprs.push(expr);
        id
    }

    /// Allocate a statement, returning its ID.
    pub fn push_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId::new(to_u32(self.stmts.len(), "statements"));
        self.stmts.push(stmt);
        id
    }

    /// Get an expression by ID.
    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    /// Get a statement by ID.
    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    /// Allocate a contiguous range of expression IDs (for call args).
    pub fn push_expr_list(&mut self, ids: &[ExprId]) -> ExprRange {
        if ids.is_empty() {
            return ExprRange::EMPTY;
        }
        let start = to_u32(self.expr_lists.len(), "expression lists");
        self.expr_lists.extend_from_slice(ids);
        ExprRange::new(start, to_u16(ids.len(), "expression list"))
    }

    /// Get expression IDs from a range.
    pub fn expr_list(&self, range: ExprRange) -> &[ExprId] {
        if range.is_empty() {
            return &[];
        }
        let start = range.start as usize;
        &self.expr_lists[start..start + range.len()]
    }

    /// Allocate a contiguous range of statement IDs (for blocks).
    pub fn push_stmt_list(&mut self, ids: &[StmtId]) -> StmtRange {
        if ids.is_empty() {
            return StmtRange::EMPTY;
        }
        let start = to_u32(self.stmt_lists.len(), "statement lists");
        self.stmt_lists.extend_from_slice(ids);
        StmtRange::new(start, to_u16(ids.len(), "statement list"))
    }

    /// Get statement IDs from a range.
    pub fn stmt_list(&self, range: StmtRange) -> &[StmtId] {
        if range.is_empty() {
            return &[];
        }
        let start = range.start as usize;
        &self.stmt_lists[start..start + range.len()]
    }

    /// Number of allocated expressions.
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    /// Number of allocated statements.
    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }
}
