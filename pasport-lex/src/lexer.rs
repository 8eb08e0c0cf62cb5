#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use logos::{FilterResult, Logos};
use miette::Diagnostic;
use pasport_ast::{byte_span_between, ByteSpan};
use thiserror::Error;

use crate::token::{Token, TokenKind};

#[derive(Debug, Error, Diagnostic)]
#[error("lex error: {message}")]
#[diagnostic(code(pasport::lex))]
#[allow(unused_assignments)]
pub struct LexError {
    pub message: String,
    #[label]
    pub span: ByteSpan,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"\{[^}]*\}")]
enum RawToken {
    #[token(":=")]
    Assign,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,

    #[token("<>")]
    Neq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("@")]
    At,

    #[token("(*", block_comment)]
    BlockComment,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // Reals lex as `Number Dot Number`; expressions are never evaluated.
    #[regex(r"[0-9]+")]
    #[regex(r"\$[0-9A-Fa-f]+")]
    Number,

    // Pascal strings escape a quote by doubling it.
    #[regex(r"'([^'\n]|'')*'")]
    Str,

    #[regex(r"#[0-9]+")]
    #[regex(r"#\$[0-9A-Fa-f]+")]
    CharCode,

    // `&` escapes a reserved word used as an identifier.
    #[regex(r"&?[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
}

pub struct Lexer<'a> {
    src: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src }
    }

    pub fn lex(&self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut lex = RawToken::lexer(self.src);

        while let Some(raw) = lex.next() {
            let range = lex.span();
            let slice = lex.slice();
            let span = byte_span_between(range.start, range.end);

            let kind = match raw {
                Ok(RawToken::Assign) => TokenKind::Assign,
                Ok(RawToken::Colon) => TokenKind::Colon,
                Ok(RawToken::Semi) => TokenKind::Semi,
                Ok(RawToken::Comma) => TokenKind::Comma,
                Ok(RawToken::DotDot) => TokenKind::DotDot,
                Ok(RawToken::Dot) => TokenKind::Dot,

                Ok(RawToken::Neq) => TokenKind::Neq,
                Ok(RawToken::Le) => TokenKind::Le,
                Ok(RawToken::Ge) => TokenKind::Ge,
                Ok(RawToken::Lt) => TokenKind::Lt,
                Ok(RawToken::Gt) => TokenKind::Gt,
                Ok(RawToken::Eq) => TokenKind::Eq,

                Ok(RawToken::Plus) => TokenKind::Plus,
                Ok(RawToken::Minus) => TokenKind::Minus,
                Ok(RawToken::Star) => TokenKind::Star,
                Ok(RawToken::Slash) => TokenKind::Slash,
                Ok(RawToken::Caret) => TokenKind::Caret,
                Ok(RawToken::At) => TokenKind::At,

                Ok(RawToken::BlockComment) => continue,
                Ok(RawToken::LParen) => TokenKind::LParen,
                Ok(RawToken::RParen) => TokenKind::RParen,
                Ok(RawToken::LBracket) => TokenKind::LBracket,
                Ok(RawToken::RBracket) => TokenKind::RBracket,

                Ok(RawToken::Number) => TokenKind::Number(slice.to_string()),
                Ok(RawToken::Str) => TokenKind::Str(unquote(slice)),
                Ok(RawToken::CharCode) => TokenKind::CharCode(slice.to_string()),
                Ok(RawToken::Ident) => match slice.strip_prefix('&') {
                    Some(escaped) => TokenKind::Ident(escaped.to_string()),
                    None => TokenKind::keyword(slice)
                        .unwrap_or_else(|| TokenKind::Ident(slice.to_string())),
                },

                Err(()) => {
                    let message = if slice.starts_with('\'') {
                        "unterminated string literal".to_string()
                    } else if slice.starts_with('{') || slice.starts_with("(*") {
                        "unterminated comment".to_string()
                    } else {
                        format!("unexpected character {slice:?}")
                    };
                    return Err(LexError { message, span });
                }
            };

            tokens.push(Token { kind, span });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            span: byte_span_between(self.src.len(), self.src.len()),
        });

        Ok(tokens)
    }
}

// `(* ... *)` does not nest; the first `*)` closes it.
fn block_comment(lex: &mut logos::Lexer<RawToken>) -> FilterResult<(), ()> {
    match lex.remainder().find("*)") {
        Some(end) => {
            lex.bump(end + 2);
            FilterResult::Skip
        }
        None => {
            lex.bump(lex.remainder().len());
            FilterResult::Error(())
        }
    }
}

fn unquote(s: &str) -> String {
    let inner = s
        .strip_prefix('\'')
        .and_then(|r| r.strip_suffix('\''))
        .unwrap_or(s);
    inner.replace("''", "'")
}
