//! Statement grammar.
//!
//! A template is a flat sequence of statements: literal text, reference
//! output, and directives. Directive bodies nest through [`StmtRange`]
//! blocks in the arena; `#if` chains are linked tail-first through the
//! `alt` field of each link.

mod expr;

use crate::{ParseError, Parser};
use velo_ir::{ExprId, Name, Stmt, StmtId, StmtKind, StmtRange, TokenKind};

/// Where a statement block ends.
///
/// The top level runs to `Eof`; directive bodies stop at `#elseif`,
/// `#else` or `#end` without consuming it.
#[derive(Copy, Clone, PartialEq, Eq)]
enum BlockEnd {
    Eof,
    Terminator,
}

impl Parser<'_> {
    /// Parse the whole template into the root statement block.
    pub(crate) fn parse_template(&mut self) -> Result<StmtRange, ParseError> {
        self.parse_stmts(BlockEnd::Eof)
    }

    /// Parse statements until the block end.
    fn parse_stmts(&mut self, end: BlockEnd) -> Result<StmtRange, ParseError> {
        let mut stmts = Vec::new();
        loop {
            match self.current_kind() {
                TokenKind::Eof => {
                    if end == BlockEnd::Terminator {
                        return Err(ParseError::new(
                            "unterminated block: missing #end",
                            self.current_span(),
                        ));
                    }
                    break;
                }
                TokenKind::ElseIf | TokenKind::Else | TokenKind::End => {
                    if end == BlockEnd::Eof {
                        return Err(ParseError::new(
                            format!("{} outside a block", self.current_kind().describe()),
                            self.current_span(),
                        ));
                    }
                    break;
                }
                _ => {
                    let stmt = self.parse_stmt()?;
                    stmts.push(stmt);
                }
            }
        }
        Ok(self.arena.push_stmt_list(&stmts))
    }

    fn parse_stmt(&mut self) -> Result<StmtId, ParseError> {
        match self.current_kind() {
            TokenKind::Text(name) => {
                let span = self.current_span();
                self.advance();
                Ok(self.arena.push_stmt(Stmt::new(StmtKind::Text(name), span)))
            }
            TokenKind::Dollar => self.parse_emit(),
            TokenKind::Set => self.parse_set(),
            TokenKind::If => self.parse_if(),
            TokenKind::ForEach => self.parse_foreach(),
            TokenKind::For => self.parse_for(),
            TokenKind::Evaluate => self.parse_evaluate(),
            other => Err(ParseError::new(
                format!("unexpected {}", other.describe()),
                self.current_span(),
            )),
        }
    }

    /// Parse a `$reference` at text level.
    ///
    /// The raw source text of the reference rides along on the
    /// statement: when the root name is never defined, rendering falls
    /// back to emitting the reference verbatim.
    fn parse_emit(&mut self) -> Result<StmtId, ParseError> {
        let start = self.current_span();
        let expr = self.parse_reference()?;
        let span = start.merge(self.previous_span());
        let raw = self.interner.intern(span.text(self.source));
        Ok(self
            .arena
            .push_stmt(Stmt::new(StmtKind::Emit { expr, raw }, span)))
    }

    /// Parse `#set($target = value)`.
    fn parse_set(&mut self) -> Result<StmtId, ParseError> {
        let start = self.current_span();
        self.advance();
        self.expect(TokenKind::LParen)?;
        let (target, value) = self.parse_assignment()?;
        self.expect(TokenKind::RParen)?;
        let span = start.merge(self.previous_span());
        Ok(self
            .arena
            .push_stmt(Stmt::new(StmtKind::Set { target, value }, span)))
    }

    /// Parse `$target = value`, the body of `#set` and `#for` clauses.
    ///
    /// The target is parsed as a full reference; the compiler rejects
    /// anything other than a bare variable.
    fn parse_assignment(&mut self) -> Result<(ExprId, ExprId), ParseError> {
        let target = self.parse_reference()?;
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        Ok((target, value))
    }

    /// Parse an `#if`/`#elseif`/`#else`/`#end` chain.
    fn parse_if(&mut self) -> Result<StmtId, ParseError> {
        let start = self.current_span();
        self.advance();
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_stmts(BlockEnd::Terminator)?;
        let alt = self.parse_if_tail()?;
        let span = start.merge(self.previous_span());
        Ok(self
            .arena
            .push_stmt(Stmt::new(StmtKind::If { cond, body, alt }, span)))
    }

    /// Parse the continuation after an `#if`/`#elseif` body: either the
    /// next chain link or the closing `#end`.
    fn parse_if_tail(&mut self) -> Result<StmtId, ParseError> {
        match self.current_kind() {
            TokenKind::End => {
                self.advance();
                Ok(StmtId::INVALID)
            }
            TokenKind::ElseIf => {
                let start = self.current_span();
                self.advance();
                self.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                let body = self.parse_stmts(BlockEnd::Terminator)?;
                let alt = self.parse_if_tail()?;
                let span = start.merge(self.previous_span());
                Ok(self
                    .arena
                    .push_stmt(Stmt::new(StmtKind::If { cond, body, alt }, span)))
            }
            TokenKind::Else => {
                let start = self.current_span();
                self.advance();
                let body = self.parse_stmts(BlockEnd::Terminator)?;
                self.expect(TokenKind::End)?;
                let span = start.merge(self.previous_span());
                let link = StmtKind::If {
                    cond: ExprId::INVALID,
                    body,
                    alt: StmtId::INVALID,
                };
                Ok(self.arena.push_stmt(Stmt::new(link, span)))
            }
            other => Err(ParseError::new(
                format!(
                    "expected #elseif, #else or #end, found {}",
                    other.describe()
                ),
                self.current_span(),
            )),
        }
    }

    /// Parse `#foreach($item in source)` or
    /// `#foreach($item, $idx in source)`.
    fn parse_foreach(&mut self) -> Result<StmtId, ParseError> {
        let start = self.current_span();
        self.advance();
        self.expect(TokenKind::LParen)?;
        self.expect(TokenKind::Dollar)?;
        let item = self.expect_ident()?;
        let index = if self.check(TokenKind::Comma) {
            self.advance();
            self.expect(TokenKind::Dollar)?;
            self.expect_ident()?
        } else {
            Name::EMPTY
        };
        self.expect(TokenKind::In)?;
        let source = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_stmts(BlockEnd::Terminator)?;
        self.expect(TokenKind::End)?;
        let span = start.merge(self.previous_span());
        let stmt = StmtKind::ForEach {
            item,
            index,
            source,
            body,
        };
        Ok(self.arena.push_stmt(Stmt::new(stmt, span)))
    }

    /// Parse `#for($i = 0; cond; $i = $i + 1)`.
    fn parse_for(&mut self) -> Result<StmtId, ParseError> {
        let start = self.current_span();
        self.advance();
        self.expect(TokenKind::LParen)?;
        let init = self.parse_clause()?;
        self.expect(TokenKind::Semicolon)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;
        let post = self.parse_clause()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_stmts(BlockEnd::Terminator)?;
        self.expect(TokenKind::End)?;
        let span = start.merge(self.previous_span());
        let stmt = StmtKind::For {
            init,
            cond,
            post,
            body,
        };
        Ok(self.arena.push_stmt(Stmt::new(stmt, span)))
    }

    /// Parse a bare `$target = value` loop clause as a `Set` node.
    fn parse_clause(&mut self) -> Result<StmtId, ParseError> {
        let start = self.current_span();
        let (target, value) = self.parse_assignment()?;
        let span = start.merge(self.previous_span());
        Ok(self
            .arena
            .push_stmt(Stmt::new(StmtKind::Set { target, value }, span)))
    }

    /// Parse `#evaluate(arg)`.
    fn parse_evaluate(&mut self) -> Result<StmtId, ParseError> {
        let start = self.current_span();
        self.advance();
        self.expect(TokenKind::LParen)?;
        let arg = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let span = start.merge(self.previous_span());
        Ok(self
            .arena
            .push_stmt(Stmt::new(StmtKind::Evaluate { arg }, span)))
    }
}
