//! The `tokens` command: dump the lexer's view of a template.

use velo_ir::{StringInterner, TokenKind};

use super::read_file;

/// Lex a file and display the token stream.
pub fn tokens_file(path: &str) {
    let content = read_file(path);
    let interner = StringInterner::new();

    let toks = match velo_lexer::lex(&content, &interner) {
        Ok(toks) => toks,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    println!("Tokens for '{}' ({} tokens):", path, toks.len());
    for tok in toks.iter() {
        println!("  {} @ {}", describe(tok.kind, &interner), tok.span);
    }
}

/// Like the `Debug` impl for [`TokenKind`], but with interned names resolved
/// back to their text.
fn describe(kind: TokenKind, interner: &StringInterner) -> String {
    match kind {
        TokenKind::Text(n) => format!("Text({:?})", interner.lookup(n)),
        TokenKind::Str(n) => format!("Str({:?})", interner.lookup(n)),
        TokenKind::Ident(n) => format!("Ident({})", interner.lookup(n)),
        TokenKind::Int(v) => format!("Int({v})"),
        TokenKind::Float(bits) => format!("Float({})", f64::from_bits(bits)),
        other => other.describe().to_string(),
    }
}
