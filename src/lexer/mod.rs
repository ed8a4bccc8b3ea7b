pub mod token;
pub use token::is_keyword;

use logos::Logos;
use crate::span::{Span, Spanned};
use crate::diagnostics::SyntaxError;
use token::Token;

/// Tokenize `source`, dropping comments and applying the newline rule:
/// a line break directly after an identifier, literal, closing bracket,
/// `return`/`break`/`continue`/`fallthrough` or `++`/`--` becomes a `;`.
/// Inserted semicolons have an empty span at the line break.
pub fn lex(source: &str) -> Result<Vec<Spanned<Token>>, SyntaxError> {
    let mut tokens: Vec<Spanned<Token>> = Vec::new();
    let mut lexer = Token::lexer(source);

    let needs_semi = |tokens: &[Spanned<Token>]| {
        tokens.last().is_some_and(|t| t.node.ends_statement())
    };

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(Token::LineComment) => {}
            Ok(Token::BlockComment) => {
                if source[span.clone()].contains('\n') && needs_semi(&tokens) {
                    tokens.push(Spanned::new(Token::Semi, Span::new(span.start, span.start)));
                }
            }
            Ok(Token::Newline) => {
                if needs_semi(&tokens) {
                    tokens.push(Spanned::new(Token::Semi, Span::new(span.start, span.start)));
                }
            }
            Ok(tok) => tokens.push(Spanned::new(tok, Span::new(span.start, span.end))),
            Err(()) => {
                let text = &source[span.start..span.end];
                let msg = if text.starts_with('"') || text.starts_with('`') || text.starts_with('\'') {
                    "unterminated literal".to_string()
                } else if text.starts_with("/*") {
                    "unterminated comment".to_string()
                } else {
                    format!("unexpected character '{text}'")
                };
                return Err(SyntaxError::new(msg, Span::new(span.start, span.end)));
            }
        }
    }

    if needs_semi(&tokens) {
        tokens.push(Spanned::new(Token::Semi, Span::new(source.len(), source.len())));
    }

    Ok(tokens)
}
