#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use miette::Diagnostic;
use pasport_ast::ByteSpan;
use pasport_lex::LexError;
use thiserror::Error;

#[derive(Clone, Debug, Error, Diagnostic)]
#[error("parse error: {message}")]
#[diagnostic(code(pasport::parse))]
#[allow(unused_assignments)]
pub struct ParseError {
    pub message: String,
    #[label]
    pub span: ByteSpan,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self {
            message: err.message,
            span: err.span,
        }
    }
}
