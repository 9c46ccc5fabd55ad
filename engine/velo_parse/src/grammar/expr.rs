//! Expression grammar.
//!
//! Binary operator precedence chain, unary `!`, postfix chains and
//! primaries. Negation is not an operator node: `-` folds into the
//! numeric literal that follows it, which also lets `i64::MIN` parse.

use crate::{ParseError, Parser};
use velo_ir::{BinaryOp, Expr, ExprId, ExprKind, ExprRange, TokenKind, UnaryOp};

impl Parser<'_> {
    /// Parse an expression.
    pub(crate) fn parse_expr(&mut self) -> Result<ExprId, ParseError> {
        self.parse_or()
    }

    /// Parse `||` (lowest precedence).
    fn parse_or(&mut self) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_and()?;

        while self.check(TokenKind::PipePipe) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = self.push_binary(BinaryOp::Or, lhs, rhs);
        }

        Ok(lhs)
    }

    /// Parse `&&`.
    fn parse_and(&mut self) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_equality()?;

        while self.check(TokenKind::AmpAmp) {
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = self.push_binary(BinaryOp::And, lhs, rhs);
        }

        Ok(lhs)
    }

    /// Parse `==` and `!=`.
    fn parse_equality(&mut self) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_comparison()?;

        while let Some(op) = self.match_equality_op() {
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = self.push_binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    /// Parse `<`, `<=`, `>`, `>=`.
    fn parse_comparison(&mut self) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_additive()?;

        while let Some(op) = self.match_comparison_op() {
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = self.push_binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    /// Parse `+` and `-`.
    fn parse_additive(&mut self) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_multiplicative()?;

        while let Some(op) = self.match_additive_op() {
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = self.push_binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    /// Parse `*` and `/`.
    fn parse_multiplicative(&mut self) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_unary()?;

        while let Some(op) = self.match_multiplicative_op() {
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = self.push_binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<ExprId, ParseError> {
        if self.check(TokenKind::Bang) {
            let start = self.current_span();
            self.advance();
            let operand = self.parse_unary()?;
            let span = start.merge(self.arena.expr(operand).span);
            return Ok(self.arena.push_expr(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand,
                },
                span,
            )));
        }

        if self.check(TokenKind::Minus) {
            return self.parse_negated_literal();
        }

        self.parse_postfix()
    }

    /// Fold `-` into the numeric literal that follows it.
    fn parse_negated_literal(&mut self) -> Result<ExprId, ParseError> {
        /// Absolute value of `i64::MIN` as `u64`.
        const I64_MIN_ABS: u64 = 9_223_372_036_854_775_808;

        let start = self.current_span();
        self.advance();

        match self.current_kind() {
            TokenKind::Int(n) => {
                self.advance();
                let span = start.merge(self.previous_span());
                if let Ok(v) = i64::try_from(n) {
                    Ok(self.arena.push_expr(Expr::new(ExprKind::Int(-v), span)))
                } else if n == I64_MIN_ABS {
                    Ok(self
                        .arena
                        .push_expr(Expr::new(ExprKind::Int(i64::MIN), span)))
                } else {
                    Err(ParseError::new("integer literal too large", span))
                }
            }
            TokenKind::Float(bits) => {
                self.advance();
                let span = start.merge(self.previous_span());
                let negated = (-ExprKind::float_value(bits)).to_bits();
                Ok(self
                    .arena
                    .push_expr(Expr::new(ExprKind::Float(negated), span)))
            }
            other => Err(ParseError::new(
                format!(
                    "`-` must be followed by a numeric literal, found {}",
                    other.describe()
                ),
                self.current_span(),
            )),
        }
    }

    /// Parse a primary with its postfix chain.
    fn parse_postfix(&mut self) -> Result<ExprId, ParseError> {
        let expr = self.parse_primary()?;
        self.parse_postfix_chain(expr)
    }

    /// Parse a full `$name` reference with its postfix chain.
    ///
    /// Also the entry point for text-level references, where the lexer
    /// has already decided which trailing punctuation belongs to the
    /// reference.
    pub(crate) fn parse_reference(&mut self) -> Result<ExprId, ParseError> {
        let start = self.current_span();
        self.expect(TokenKind::Dollar)?;
        let name = self.expect_ident()?;
        let span = start.merge(self.previous_span());
        let var = self.arena.push_expr(Expr::new(ExprKind::Var(name), span));
        self.parse_postfix_chain(var)
    }

    /// Apply `.field`, `.method(args)` and `[index]` to an expression.
    fn parse_postfix_chain(&mut self, mut expr: ExprId) -> Result<ExprId, ParseError> {
        loop {
            if self.check(TokenKind::Dot) {
                self.advance();
                let name = self.expect_ident()?;

                if self.check(TokenKind::LParen) {
                    self.advance();
                    let args = self.parse_call_args()?;
                    self.expect(TokenKind::RParen)?;
                    let span = self.arena.expr(expr).span.merge(self.previous_span());
                    expr = self.arena.push_expr(Expr::new(
                        ExprKind::Call {
                            base: expr,
                            name,
                            args,
                        },
                        span,
                    ));
                } else {
                    let span = self.arena.expr(expr).span.merge(self.previous_span());
                    expr = self
                        .arena
                        .push_expr(Expr::new(ExprKind::Field { base: expr, name }, span));
                }
            } else if self.check(TokenKind::LBracket) {
                self.advance();
                let index = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                let span = self.arena.expr(expr).span.merge(self.previous_span());
                expr = self
                    .arena
                    .push_expr(Expr::new(ExprKind::Index { base: expr, index }, span));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Parse comma-separated call arguments up to (not including) the
    /// closing paren.
    fn parse_call_args(&mut self) -> Result<ExprRange, ParseError> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.check(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        Ok(self.arena.push_expr_list(&args))
    }

    fn parse_primary(&mut self) -> Result<ExprId, ParseError> {
        match self.current_kind() {
            TokenKind::Int(n) => {
                let span = self.current_span();
                self.advance();
                let value = i64::try_from(n)
                    .map_err(|_| ParseError::new("integer literal too large", span))?;
                Ok(self.arena.push_expr(Expr::new(ExprKind::Int(value), span)))
            }
            TokenKind::Float(bits) => {
                let span = self.current_span();
                self.advance();
                Ok(self.arena.push_expr(Expr::new(ExprKind::Float(bits), span)))
            }
            TokenKind::Str(name) => {
                let span = self.current_span();
                self.advance();
                Ok(self.arena.push_expr(Expr::new(ExprKind::Str(name), span)))
            }
            TokenKind::True => {
                let span = self.current_span();
                self.advance();
                Ok(self
                    .arena
                    .push_expr(Expr::new(ExprKind::Bool(true), span)))
            }
            TokenKind::False => {
                let span = self.current_span();
                self.advance();
                Ok(self
                    .arena
                    .push_expr(Expr::new(ExprKind::Bool(false), span)))
            }
            TokenKind::Dollar => self.parse_reference(),
            TokenKind::LParen => {
                let start = self.current_span();
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                let span = start.merge(self.previous_span());
                Ok(self
                    .arena
                    .push_expr(Expr::new(ExprKind::Paren(inner), span)))
            }
            TokenKind::LBracket => {
                let start = self.current_span();
                self.advance();
                let lo = self.parse_expr()?;
                self.expect(TokenKind::DotDotDot)?;
                let hi = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                let span = start.merge(self.previous_span());
                Ok(self
                    .arena
                    .push_expr(Expr::new(ExprKind::Range { lo, hi }, span)))
            }
            other => Err(ParseError::new(
                format!("expected expression, found {}", other.describe()),
                self.current_span(),
            )),
        }
    }

    fn push_binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        let span = self.arena.expr(lhs).span.merge(self.arena.expr(rhs).span);
        self.arena
            .push_expr(Expr::new(ExprKind::Binary { op, lhs, rhs }, span))
    }

    // Operator matching helpers.

    fn match_equality_op(&self) -> Option<BinaryOp> {
        match self.current_kind() {
            TokenKind::EqEq => Some(BinaryOp::Eq),
            TokenKind::NotEq => Some(BinaryOp::NotEq),
            _ => None,
        }
    }

    fn match_comparison_op(&self) -> Option<BinaryOp> {
        match self.current_kind() {
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::LtEq => Some(BinaryOp::LtEq),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::GtEq => Some(BinaryOp::GtEq),
            _ => None,
        }
    }

    fn match_additive_op(&self) -> Option<BinaryOp> {
        match self.current_kind() {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            _ => None,
        }
    }

    fn match_multiplicative_op(&self) -> Option<BinaryOp> {
        match self.current_kind() {
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            _ => None,
        }
    }
}
