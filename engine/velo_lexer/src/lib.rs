//! Lexer for Velo templates.
//!
//! Template sources mix raw output text with two kinds of code islands:
//! references (`$user.Name`) and directives (`#set(...)`, `#if(...)`, ...).
//! The lexer walks the text by hand, switching into a logos-driven code
//! lexer whenever it enters a parenthesized or bracketed code region, and
//! switching back once the region's delimiters balance.
//!
//! Anything that does not form a valid reference or directive head stays
//! literal text: `$5`, a lone `#`, or `#unknown` all pass through verbatim.
//! `\$` and `\#` escape the trigger characters.

use logos::Logos;
use velo_ir::{Span, StringInterner, Token, TokenKind, TokenList};

/// Error from template lexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// Template source exceeds the u32 span range.
    SourceTooLarge { len: usize },
    /// A directive or reference code region was never closed.
    UnclosedDelimiter { span: Span },
    /// Unrecognized input inside a code region.
    InvalidToken { span: Span },
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexError::SourceTooLarge { len } => {
                write!(f, "template source is {len} bytes, max is {}", u32::MAX)
            }
            LexError::UnclosedDelimiter { span } => {
                write!(f, "unclosed `(` or `[` in code starting at {span}")
            }
            LexError::InvalidToken { span } => {
                write!(f, "unrecognized token in code at {span}")
            }
        }
    }
}

impl std::error::Error for LexError {}

/// Raw code token from logos (before interning).
///
/// Only used inside directive/reference code regions; template text never
/// reaches this lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum CodeToken {
    #[token("in")]
    In,
    #[token("true")]
    True,
    #[token("false")]
    False,

    #[token("$")]
    Dollar,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("...")]
    DotDotDot,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,

    #[token("==")]
    EqEq,
    #[token("=")]
    Assign,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token("<")]
    Lt,
    #[token(">=")]
    GtEq,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("!")]
    Bang,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,

    // Float before int so `1.5` never splits as Int Dot Int; `1...5`
    // still lexes as Int DotDotDot Int because float needs a digit after
    // the dot.
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", |lex| {
        lex.slice().replace('_', "").parse::<f64>().ok()
    })]
    Float(f64),

    #[regex(r"[0-9][0-9_]*", |lex| {
        lex.slice().replace('_', "").parse::<u64>().ok()
    })]
    Int(u64),

    // String literals, double- or single-quoted (no unescaped newlines)
    #[regex(r#""([^"\\\n\r]|\\.)*""#)]
    DoubleStr,
    #[regex(r"'([^'\\\n\r]|\\.)*'")]
    SingleStr,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

/// Which delimiter pair bounds a code region.
#[derive(Copy, Clone, PartialEq, Eq)]
enum Delim {
    Paren,
    Bracket,
}

/// Directive keywords, longest-prefix first so `#elseif` wins over `#else`
/// and `#foreach` over `#for`. The bool marks head directives that must be
/// followed by a parenthesized code region.
const DIRECTIVES: &[(&str, TokenKind, bool)] = &[
    ("elseif", TokenKind::ElseIf, true),
    ("else", TokenKind::Else, false),
    ("end", TokenKind::End, false),
    ("evaluate", TokenKind::Evaluate, true),
    ("foreach", TokenKind::ForEach, true),
    ("for", TokenKind::For, true),
    ("set", TokenKind::Set, true),
    ("if", TokenKind::If, true),
];

struct Lexer<'src> {
    src: &'src str,
    interner: &'src StringInterner,
    tokens: TokenList,
    /// Cooked text accumulated since the last flush (escapes resolved).
    pending: String,
    /// Source offset where the current text run began.
    text_start: usize,
    pos: usize,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl<'src> Lexer<'src> {
    fn new(src: &'src str, interner: &'src StringInterner) -> Self {
        Lexer {
            src,
            interner,
            tokens: TokenList::with_capacity(src.len() / 8 + 4),
            pending: String::new(),
            text_start: 0,
            pos: 0,
        }
    }

    fn run(mut self) -> Result<TokenList, LexError> {
        let bytes = self.src.as_bytes();

        while self.pos < bytes.len() {
            let rest = &self.src[self.pos..];
            let Some(off) = rest.find(|c| matches!(c, '$' | '#' | '\\')) else {
                self.pending.push_str(rest);
                self.pos = bytes.len();
                break;
            };

            self.pending.push_str(&rest[..off]);
            self.pos += off;

            match bytes[self.pos] {
                b'\\' => {
                    // `\$` and `\#` escape; any other backslash is literal.
                    match bytes.get(self.pos + 1) {
                        Some(&c @ (b'$' | b'#')) => {
                            self.pending.push(c as char);
                            self.pos += 2;
                        }
                        _ => {
                            self.pending.push('\\');
                            self.pos += 1;
                        }
                    }
                }
                b'$' => {
                    if self.pos + 1 < bytes.len() && is_ident_start(bytes[self.pos + 1]) {
                        self.flush_text();
                        self.lex_reference()?;
                    } else {
                        self.pending.push('$');
                        self.pos += 1;
                    }
                }
                b'#' => {
                    if !self.try_directive()? {
                        self.pending.push('#');
                        self.pos += 1;
                    }
                }
                _ => unreachable!(),
            }
        }

        self.flush_text();
        let eof = Span::point(to_u32(self.src.len()));
        self.tokens.push(Token::new(TokenKind::Eof, eof));
        Ok(self.tokens)
    }

    /// Emit the accumulated text run, if any.
    fn flush_text(&mut self) {
        if !self.pending.is_empty() {
            let name = self.interner.intern(&self.pending);
            let span = Span::new(to_u32(self.text_start), to_u32(self.pos));
            self.tokens.push(Token::new(TokenKind::Text(name), span));
            self.pending.clear();
        }
        self.text_start = self.pos;
    }

    /// Scan one identifier starting at `self.pos`, emit it, advance.
    fn lex_ident(&mut self) {
        let bytes = self.src.as_bytes();
        let start = self.pos;
        let mut end = start;
        while end < bytes.len() && is_ident_continue(bytes[end]) {
            end += 1;
        }
        let name = self.interner.intern(&self.src[start..end]);
        let span = Span::new(to_u32(start), to_u32(end));
        self.tokens.push(Token::new(TokenKind::Ident(name), span));
        self.pos = end;
    }

    /// Lex a text-mode reference: `$ident(.ident | (args) | [index])*`.
    ///
    /// The caller has verified an identifier follows the `$`. Postfix
    /// segments must be adjacent (no whitespace); the first char that does
    /// not extend the reference returns control to text mode.
    fn lex_reference(&mut self) -> Result<(), LexError> {
        let bytes = self.src.as_bytes();

        let dollar = Span::new(to_u32(self.pos), to_u32(self.pos + 1));
        self.tokens.push(Token::new(TokenKind::Dollar, dollar));
        self.pos += 1;

        self.lex_ident();

        loop {
            match bytes.get(self.pos) {
                Some(b'.')
                    if self
                        .pos
                        .checked_add(1)
                        .and_then(|i| bytes.get(i))
                        .is_some_and(|&b| is_ident_start(b)) =>
                {
                    let dot = Span::new(to_u32(self.pos), to_u32(self.pos + 1));
                    self.tokens.push(Token::new(TokenKind::Dot, dot));
                    self.pos += 1;
                    self.lex_ident();

                    // Call parens bind to the `.name` segment just lexed;
                    // in `$name(..)` without a dot the parens stay text.
                    if bytes.get(self.pos) == Some(&b'(') {
                        self.lex_code_region(Delim::Paren)?;
                    }
                }
                Some(b'[') => self.lex_code_region(Delim::Bracket)?,
                _ => break,
            }
        }

        self.text_start = self.pos;
        Ok(())
    }

    /// Try to lex a directive at `self.pos` (which holds `#`).
    ///
    /// Returns false without consuming anything when no directive matches,
    /// so the `#` falls back to literal text.
    fn try_directive(&mut self) -> Result<bool, LexError> {
        let bytes = self.src.as_bytes();
        let after_hash = &self.src[self.pos + 1..];

        for &(word, kind, has_args) in DIRECTIVES {
            if !after_hash.starts_with(word) {
                continue;
            }
            let kw_end = self.pos + 1 + word.len();
            // Word boundary: `#settings` is not `#set`.
            if bytes.get(kw_end).is_some_and(|&b| is_ident_continue(b)) {
                continue;
            }

            if !has_args {
                self.flush_text();
                let span = Span::new(to_u32(self.pos), to_u32(kw_end));
                self.tokens.push(Token::new(kind, span));
                self.pos = kw_end;
                self.text_start = self.pos;
                return Ok(true);
            }

            // Head directives need `(...)`; allow spaces before the paren.
            let mut open = kw_end;
            while bytes.get(open).is_some_and(|&b| b == b' ' || b == b'\t') {
                open += 1;
            }
            if bytes.get(open) != Some(&b'(') {
                return Ok(false);
            }

            self.flush_text();
            let span = Span::new(to_u32(self.pos), to_u32(kw_end));
            self.tokens.push(Token::new(kind, span));
            self.pos = open;
            self.lex_code_region(Delim::Paren)?;
            return Ok(true);
        }

        Ok(false)
    }

    /// Lex a balanced code region starting at the opening delimiter.
    ///
    /// Emits every token in the region including both delimiters, then
    /// returns to text mode at the byte after the close.
    fn lex_code_region(&mut self, delim: Delim) -> Result<(), LexError> {
        let region_start = self.pos;
        let mut lexer = CodeToken::lexer(&self.src[region_start..]);
        let mut depth = 0u32;

        while let Some(result) = lexer.next() {
            let rel = lexer.span();
            let span = Span::new(
                to_u32(region_start + rel.start),
                to_u32(region_start + rel.end),
            );
            let raw = result.map_err(|()| LexError::InvalidToken { span })?;
            let kind = convert_code(raw, lexer.slice(), self.interner);

            match (kind, delim) {
                (TokenKind::LParen, Delim::Paren) | (TokenKind::LBracket, Delim::Bracket) => {
                    depth += 1;
                }
                (TokenKind::RParen, Delim::Paren) | (TokenKind::RBracket, Delim::Bracket) => {
                    depth -= 1;
                }
                _ => {}
            }

            self.tokens.push(Token::new(kind, span));

            if depth == 0 {
                self.pos = region_start + rel.end;
                self.text_start = self.pos;
                return Ok(());
            }
        }

        Err(LexError::UnclosedDelimiter {
            span: Span::point(to_u32(region_start)),
        })
    }
}

/// Convert a raw code token to a `TokenKind`, interning strings.
fn convert_code(raw: CodeToken, slice: &str, interner: &StringInterner) -> TokenKind {
    match raw {
        CodeToken::Int(n) => TokenKind::Int(n),
        CodeToken::Float(f) => TokenKind::Float(f.to_bits()),
        CodeToken::DoubleStr => {
            let content = &slice[1..slice.len() - 1];
            TokenKind::Str(interner.intern(&unescape_string(content, '"')))
        }
        CodeToken::SingleStr => {
            let content = &slice[1..slice.len() - 1];
            TokenKind::Str(interner.intern(&unescape_string(content, '\'')))
        }
        CodeToken::Ident => TokenKind::Ident(interner.intern(slice)),

        CodeToken::In => TokenKind::In,
        CodeToken::True => TokenKind::True,
        CodeToken::False => TokenKind::False,

        CodeToken::Dollar => TokenKind::Dollar,
        CodeToken::LParen => TokenKind::LParen,
        CodeToken::RParen => TokenKind::RParen,
        CodeToken::LBracket => TokenKind::LBracket,
        CodeToken::RBracket => TokenKind::RBracket,
        CodeToken::DotDotDot => TokenKind::DotDotDot,
        CodeToken::Dot => TokenKind::Dot,
        CodeToken::Comma => TokenKind::Comma,
        CodeToken::Semicolon => TokenKind::Semicolon,

        CodeToken::EqEq => TokenKind::EqEq,
        CodeToken::Assign => TokenKind::Assign,
        CodeToken::NotEq => TokenKind::NotEq,
        CodeToken::LtEq => TokenKind::LtEq,
        CodeToken::Lt => TokenKind::Lt,
        CodeToken::GtEq => TokenKind::GtEq,
        CodeToken::Gt => TokenKind::Gt,
        CodeToken::Plus => TokenKind::Plus,
        CodeToken::Minus => TokenKind::Minus,
        CodeToken::Star => TokenKind::Star,
        CodeToken::Slash => TokenKind::Slash,
        CodeToken::Bang => TokenKind::Bang,
        CodeToken::AmpAmp => TokenKind::AmpAmp,
        CodeToken::PipePipe => TokenKind::PipePipe,
    }
}

/// Process string escape sequences.
fn unescape_string(s: &str, quote: char) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') | None => result.push('\\'),
                Some(q) if q == quote => result.push(q),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Offsets are bounded by the source-length guard in [`lex`].
fn to_u32(v: usize) -> u32 {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "lex() rejects sources over u32::MAX bytes"
    )]
    {
        v as u32
    }
}

/// Lex a template source into a `TokenList`.
pub fn lex(source: &str, interner: &StringInterner) -> Result<TokenList, LexError> {
    if u32::try_from(source.len()).is_err() {
        return Err(LexError::SourceTooLarge { len: source.len() });
    }
    Lexer::new(source, interner).run()
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(src: &str, interner: &StringInterner) -> Vec<TokenKind> {
        lex(src, interner)
            .unwrap()
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    fn text_of(interner: &StringInterner, kind: TokenKind) -> String {
        match kind {
            TokenKind::Text(n) | TokenKind::Str(n) | TokenKind::Ident(n) => {
                interner.lookup(n).to_string()
            }
            other => panic!("not a text-carrying token: {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_one_token() {
        let interner = StringInterner::new();
        let toks = kinds("hello world", &interner);
        assert_eq!(toks.len(), 2);
        assert_eq!(text_of(&interner, toks[0]), "hello world");
        assert_eq!(toks[1], TokenKind::Eof);
    }

    #[test]
    fn escapes_cook_into_text() {
        let interner = StringInterner::new();
        let toks = kinds(r"price: \$5 \#1", &interner);
        assert_eq!(toks.len(), 2);
        assert_eq!(text_of(&interner, toks[0]), "price: $5 #1");
    }

    #[test]
    fn dollar_without_ident_is_text() {
        let interner = StringInterner::new();
        let toks = kinds("$5 and $ alone", &interner);
        assert_eq!(toks.len(), 2);
        assert_eq!(text_of(&interner, toks[0]), "$5 and $ alone");
    }

    #[test]
    fn simple_reference() {
        let interner = StringInterner::new();
        let name = interner.intern("name");
        let toks = kinds("hi $name!", &interner);
        assert_eq!(
            toks,
            vec![
                TokenKind::Text(interner.intern("hi ")),
                TokenKind::Dollar,
                TokenKind::Ident(name),
                TokenKind::Text(interner.intern("!")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn dotted_reference_with_call_and_index() {
        let interner = StringInterner::new();
        let toks = kinds(r#"$user.Tags[0].Pad(3, "x")"#, &interner);
        assert_eq!(
            toks,
            vec![
                TokenKind::Dollar,
                TokenKind::Ident(interner.intern("user")),
                TokenKind::Dot,
                TokenKind::Ident(interner.intern("Tags")),
                TokenKind::LBracket,
                TokenKind::Int(0),
                TokenKind::RBracket,
                TokenKind::Dot,
                TokenKind::Ident(interner.intern("Pad")),
                TokenKind::LParen,
                TokenKind::Int(3),
                TokenKind::Comma,
                TokenKind::Str(interner.intern("x")),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn bare_parens_after_reference_stay_text() {
        let interner = StringInterner::new();
        let toks = kinds("$here(now)", &interner);
        assert_eq!(
            toks,
            vec![
                TokenKind::Dollar,
                TokenKind::Ident(interner.intern("here")),
                TokenKind::Text(interner.intern("(now)")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn trailing_dot_stays_text() {
        let interner = StringInterner::new();
        let toks = kinds("$name. done", &interner);
        assert_eq!(
            toks,
            vec![
                TokenKind::Dollar,
                TokenKind::Ident(interner.intern("name")),
                TokenKind::Text(interner.intern(". done")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn set_directive() {
        let interner = StringInterner::new();
        let toks = kinds("#set($v = 2*2+3)", &interner);
        assert_eq!(
            toks,
            vec![
                TokenKind::Set,
                TokenKind::LParen,
                TokenKind::Dollar,
                TokenKind::Ident(interner.intern("v")),
                TokenKind::Assign,
                TokenKind::Int(2),
                TokenKind::Star,
                TokenKind::Int(2),
                TokenKind::Plus,
                TokenKind::Int(3),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn if_chain_directives() {
        let interner = StringInterner::new();
        let toks = kinds("#if($a)x#elseif($b)y#else z#end", &interner);
        assert_eq!(
            toks,
            vec![
                TokenKind::If,
                TokenKind::LParen,
                TokenKind::Dollar,
                TokenKind::Ident(interner.intern("a")),
                TokenKind::RParen,
                TokenKind::Text(interner.intern("x")),
                TokenKind::ElseIf,
                TokenKind::LParen,
                TokenKind::Dollar,
                TokenKind::Ident(interner.intern("b")),
                TokenKind::RParen,
                TokenKind::Text(interner.intern("y")),
                TokenKind::Else,
                TokenKind::Text(interner.intern(" z")),
                TokenKind::End,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn foreach_with_index_binding() {
        let interner = StringInterner::new();
        let toks = kinds("#foreach($x, $i in $items)$x#end", &interner);
        assert_eq!(toks[0], TokenKind::ForEach);
        assert!(toks.contains(&TokenKind::Comma));
        assert!(toks.contains(&TokenKind::In));
        assert_eq!(*toks.last().unwrap(), TokenKind::Eof);
    }

    #[test]
    fn range_literal_uses_ellipsis() {
        let interner = StringInterner::new();
        let toks = kinds("#foreach($i in [1...5])$i#end", &interner);
        assert!(toks.contains(&TokenKind::DotDotDot));
        assert!(toks.contains(&TokenKind::Int(1)));
        assert!(toks.contains(&TokenKind::Int(5)));
    }

    #[test]
    fn unknown_directive_is_text() {
        let interner = StringInterner::new();
        let toks = kinds("#unknown(1) #settings(2)", &interner);
        assert_eq!(toks.len(), 2);
        assert_eq!(text_of(&interner, toks[0]), "#unknown(1) #settings(2)");
    }

    #[test]
    fn directive_without_parens_is_text() {
        let interner = StringInterner::new();
        let toks = kinds("#set without parens", &interner);
        assert_eq!(toks.len(), 2);
        assert_eq!(text_of(&interner, toks[0]), "#set without parens");
    }

    #[test]
    fn ident_starting_with_in_is_not_keyword() {
        let interner = StringInterner::new();
        let toks = kinds("#foreach($item in $index)$item#end", &interner);
        assert_eq!(
            toks.iter()
                .filter(|k| matches!(k, TokenKind::In))
                .count(),
            1
        );
        assert!(toks.contains(&TokenKind::Ident(interner.intern("index"))));
    }

    #[test]
    fn nested_parens_balance() {
        let interner = StringInterner::new();
        let toks = kinds("#if(($a || $b) && !$c)yes#end", &interner);
        assert_eq!(
            toks.iter()
                .filter(|k| matches!(k, TokenKind::LParen))
                .count(),
            2
        );
        assert!(toks.contains(&TokenKind::AmpAmp));
        assert!(toks.contains(&TokenKind::Bang));
    }

    #[test]
    fn unclosed_directive_errors() {
        let interner = StringInterner::new();
        let err = lex("#if($a", &interner).unwrap_err();
        assert!(matches!(err, LexError::UnclosedDelimiter { .. }));
    }

    #[test]
    fn single_quoted_strings() {
        let interner = StringInterner::new();
        let toks = kinds(r"#set($s = 'it\'s')", &interner);
        assert!(toks.contains(&TokenKind::Str(interner.intern("it's"))));
    }

    #[test]
    fn float_literals_keep_bits() {
        let interner = StringInterner::new();
        let toks = kinds("#set($f = 2.5e-8)", &interner);
        assert!(toks.contains(&TokenKind::Float(2.5e-8_f64.to_bits())));
    }

    #[test]
    fn spans_cover_source() {
        let interner = StringInterner::new();
        let tokens = lex("ab$cd", &interner).unwrap();
        let spans: Vec<Span> = tokens.iter().map(|t| t.span).collect();
        assert_eq!(spans[0], Span::new(0, 2)); // "ab"
        assert_eq!(spans[1], Span::new(2, 3)); // "$"
        assert_eq!(spans[2], Span::new(3, 5)); // "cd"
        assert_eq!(spans[3], Span::point(5)); // eof
    }
}
