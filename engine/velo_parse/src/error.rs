//! Parse error type.

use std::fmt;
use velo_ir::Span;
use velo_lexer::LexError;

/// An error produced while lexing or parsing a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    message: String,
    span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        ParseError {
            message: message.into(),
            span,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte range of the offending source, `Span::DUMMY` when the error
    /// has no location (e.g. source size limit).
    pub fn span(&self) -> Span {
        self.span
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span == Span::DUMMY {
            f.write_str(&self.message)
        } else {
            write!(f, "{} at {}", self.message, self.span)
        }
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        match err {
            LexError::SourceTooLarge { len } => ParseError::new(
                format!("template source is {len} bytes, max is {}", u32::MAX),
                Span::DUMMY,
            ),
            LexError::UnclosedDelimiter { span } => {
                ParseError::new("unclosed `(` or `[` in code", span)
            }
            LexError::InvalidToken { span } => ParseError::new("unrecognized token in code", span),
        }
    }
}
