//! Recursive descent parser for Velo templates.
//!
//! [`parse`] lexes the source and produces a [`ParsedTemplate`]: a flat
//! [`TemplateArena`] plus the root statement block. Statement and
//! expression grammars live in the `grammar` module as `Parser`
//! extensions.

mod cursor;
mod error;
mod grammar;

pub use error::ParseError;

use cursor::Cursor;
use velo_ir::{
    Name, Span, StmtRange, StringInterner, TemplateArena, Token, TokenKind, TokenList,
};

/// A successfully parsed template.
#[derive(Debug)]
pub struct ParsedTemplate {
    pub arena: TemplateArena,
    pub root: StmtRange,
}

/// Parse template source into a [`ParsedTemplate`].
///
/// Names (identifiers, text runs, string literals) are interned into
/// `interner`, which the caller shares with later compilation stages.
pub fn parse(source: &str, interner: &StringInterner) -> Result<ParsedTemplate, ParseError> {
    let tokens = velo_lexer::lex(source, interner)?;
    let mut parser = Parser::new(&tokens, source, interner);
    let root = parser.parse_template()?;

    let Parser { arena, .. } = parser;
    Ok(ParsedTemplate { arena, root })
}

/// Parser state.
struct Parser<'a> {
    cursor: Cursor<'a>,
    source: &'a str,
    interner: &'a StringInterner,
    arena: TemplateArena,
}

impl<'a> Parser<'a> {
    /// Create a parser over an already-lexed token stream.
    ///
    /// `source` must be the text the tokens were lexed from; reference
    /// statements keep their raw source slice for fallback output.
    fn new(tokens: &'a TokenList, source: &'a str, interner: &'a StringInterner) -> Self {
        Parser {
            cursor: Cursor::new(tokens),
            source,
            interner,
            arena: TemplateArena::with_capacity(source.len()),
        }
    }

    // Cursor delegation.

    #[inline]
    fn current_kind(&self) -> TokenKind {
        self.cursor.current_kind()
    }

    #[inline]
    fn current_span(&self) -> Span {
        self.cursor.current_span()
    }

    #[inline]
    fn previous_span(&self) -> Span {
        self.cursor.previous_span()
    }

    #[inline]
    fn check(&self, kind: TokenKind) -> bool {
        self.cursor.check(kind)
    }

    #[inline]
    fn advance(&mut self) -> Token {
        self.cursor.advance()
    }

    /// Consume the current token if it matches, else error.
    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.expect_error(kind))
        }
    }

    /// Build the error for a failed `expect()`.
    ///
    /// Separated as `#[cold]` so the `format!` allocation stays out of
    /// the `expect()` fast path.
    #[cold]
    fn expect_error(&self, kind: TokenKind) -> ParseError {
        ParseError::new(
            format!(
                "expected {}, found {}",
                kind.describe(),
                self.current_kind().describe()
            ),
            self.current_span(),
        )
    }

    /// Consume an identifier, returning its interned name.
    fn expect_ident(&mut self) -> Result<Name, ParseError> {
        if let TokenKind::Ident(name) = self.current_kind() {
            self.advance();
            Ok(name)
        } else {
            Err(ParseError::new(
                format!(
                    "expected identifier, found {}",
                    self.current_kind().describe()
                ),
                self.current_span(),
            ))
        }
    }
}
