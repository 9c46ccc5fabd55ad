//! Tokens for the Velo template language.
//!
//! A template token stream mixes two worlds: `Text` tokens carry raw template
//! output verbatim, everything else comes from directive and reference code
//! regions.

use crate::{Name, Span};
use std::fmt;

/// Token kinds for Velo templates.
///
/// Float literals store bits as u64 for Eq/Hash.
/// Text/String/Ident use interned [`Name`] for Eq/Hash.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub enum TokenKind {
    /// Raw template text between directives and references.
    /// Escape sequences (`\$`, `\#`) are already resolved.
    Text(Name),

    /// Integer literal: 42 (stored as u64; negation folded in parser)
    Int(u64),
    /// Float literal: 3.14, 2.5e-8 (stored as bits for Eq/Hash)
    Float(u64),
    /// String literal (interned, escapes resolved): "hello" or 'hello'
    Str(Name),
    /// Identifier (interned)
    Ident(Name),

    // Directive keywords (`#set`, `#if`, ...)
    Set,
    If,
    ElseIf,
    Else,
    End,
    ForEach,
    For,
    Evaluate,

    // Code keywords
    In,
    True,
    False,

    Dollar,    // $
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    Dot,       // .
    DotDotDot, // ...
    Comma,     // ,
    Semicolon, // ;

    Assign,   // =
    EqEq,     // ==
    NotEq,    // !=
    Lt,       // <
    LtEq,     // <=
    Gt,       // >
    GtEq,     // >=
    Plus,     // +
    Minus,    // -
    Star,     // *
    Slash,    // /
    Bang,     // !
    AmpAmp,   // &&
    PipePipe, // ||

    Eof,
}

impl TokenKind {
    /// Short human-readable description, used in parse error messages.
    pub const fn describe(self) -> &'static str {
        match self {
            TokenKind::Text(_) => "template text",
            TokenKind::Int(_) => "integer literal",
            TokenKind::Float(_) => "float literal",
            TokenKind::Str(_) => "string literal",
            TokenKind::Ident(_) => "identifier",
            TokenKind::Set => "#set",
            TokenKind::If => "#if",
            TokenKind::ElseIf => "#elseif",
            TokenKind::Else => "#else",
            TokenKind::End => "#end",
            TokenKind::ForEach => "#foreach",
            TokenKind::For => "#for",
            TokenKind::Evaluate => "#evaluate",
            TokenKind::In => "`in`",
            TokenKind::True => "`true`",
            TokenKind::False => "`false`",
            TokenKind::Dollar => "`$`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Dot => "`.`",
            TokenKind::DotDotDot => "`...`",
            TokenKind::Comma => "`,`",
            TokenKind::Semicolon => "`;`",
            TokenKind::Assign => "`=`",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::Lt => "`<`",
            TokenKind::LtEq => "`<=`",
            TokenKind::Gt => "`>`",
            TokenKind::GtEq => "`>=`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Bang => "`!`",
            TokenKind::AmpAmp => "`&&`",
            TokenKind::PipePipe => "`||`",
            TokenKind::Eof => "end of template",
        }
    }
}

impl fmt::Debug for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Text(n) => write!(f, "Text({})", n.raw()),
            TokenKind::Int(v) => write!(f, "Int({v})"),
            TokenKind::Float(bits) => write!(f, "Float({})", f64::from_bits(*bits)),
            TokenKind::Str(n) => write!(f, "Str({})", n.raw()),
            TokenKind::Ident(n) => write!(f, "Ident({})", n.raw()),
            other => f.write_str(other.describe()),
        }
    }
}

/// A token with its source span.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[inline]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }
}

/// Token stream produced by the lexer.
///
/// Always terminated by an `Eof` token, so cursor reads past the end are
/// well-defined.
#[derive(Clone, Debug, Default)]
pub struct TokenList {
    tokens: Vec<Token>,
}

impl TokenList {
    pub fn new() -> Self {
        TokenList { tokens: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        TokenList {
            tokens: Vec::with_capacity(cap),
        }
    }

    #[inline]
    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Token at `idx`, or the trailing `Eof` when `idx` is out of range.
    #[inline]
    pub fn get(&self, idx: usize) -> Token {
        match self.tokens.get(idx) {
            Some(tok) => *tok,
            None => {
                let end = self.tokens.last().map_or(0, |t| t.span.end);
                Token::new(TokenKind::Eof, Span::point(end))
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }
}

impl<'a> IntoIterator for &'a TokenList {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
