#![forbid(unsafe_code)]

use pasport_ast::{byte_span, ByteSpan};
use pasport_lex::{Token, TokenKind};

use crate::error::ParseError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    Unit,
    UnitHeader,
    UsesClause,
    TypeDecl,
    ClassType,
    Heritage,
    FieldDecl,
    PropertyDecl,
    RoutineHeading,
    FormalParams,
    RoutineDecl,
    LocalDecls,
    CompoundStmt,
    IfStmt,
    WhileStmt,
    ForStmt,
    WithStmt,
    TryStmt,
    CaseStmt,
    CaseArm,
    RepeatStmt,
    SimpleStmt,
    Expr,
    TypeRef,
    /// `initialization` / `finalization` part of a unit.
    UnitSection,
    Error,
}

impl SyntaxKind {
    /// Constructs that open a nested statement list.
    pub fn is_block(self) -> bool {
        matches!(
            self,
            SyntaxKind::CompoundStmt
                | SyntaxKind::IfStmt
                | SyntaxKind::WhileStmt
                | SyntaxKind::ForStmt
                | SyntaxKind::WithStmt
                | SyntaxKind::TryStmt
                | SyntaxKind::CaseStmt
                | SyntaxKind::RepeatStmt
        )
    }

    pub fn is_statement(self) -> bool {
        self.is_block() || self == SyntaxKind::SimpleStmt
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SyntaxElement {
    Node(SyntaxNode),
    Token(Token),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    pub span: ByteSpan,
    pub children: Vec<SyntaxElement>,
}

impl SyntaxNode {
    pub(crate) fn new(kind: SyntaxKind, children: Vec<SyntaxElement>, fallback_offset: usize) -> Self {
        let start = children.first().map(element_start);
        let end = children.last().map(element_end);
        let span = match (start, end) {
            (Some(s), Some(e)) if e >= s => byte_span(s, e - s),
            _ => byte_span(fallback_offset, 0),
        };
        Self {
            kind,
            span,
            children,
        }
    }

    pub fn start(&self) -> usize {
        self.span.offset()
    }

    pub fn end(&self) -> usize {
        self.span.offset() + self.span.len()
    }

    pub fn text<'s>(&self, src: &'s str) -> &'s str {
        src.get(self.start()..self.end()).unwrap_or("")
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter_map(|c| match c {
            SyntaxElement::Node(n) => Some(n),
            SyntaxElement::Token(_) => None,
        })
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.children.iter().filter_map(|c| match c {
            SyntaxElement::Token(t) => Some(t),
            SyntaxElement::Node(_) => None,
        })
    }

    pub fn child(&self, kind: SyntaxKind) -> Option<&SyntaxNode> {
        self.nodes().find(|n| n.kind == kind)
    }

    pub fn first_token(&self) -> Option<&Token> {
        self.children.first().and_then(|c| match c {
            SyntaxElement::Token(t) => Some(t),
            SyntaxElement::Node(n) => n.first_token(),
        })
    }

    pub fn last_token(&self) -> Option<&Token> {
        self.children.last().and_then(|c| match c {
            SyntaxElement::Token(t) => Some(t),
            SyntaxElement::Node(n) => n.last_token(),
        })
    }

    /// First direct identifier token.
    pub fn ident(&self) -> Option<&str> {
        self.tokens().find_map(|t| match &t.kind {
            TokenKind::Ident(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Pre-order search over all descendants.
    pub fn descendants(&self) -> Vec<&SyntaxNode> {
        let mut out = Vec::new();
        for n in self.nodes() {
            out.push(n);
            out.extend(n.descendants());
        }
        out
    }
}

fn element_start(e: &SyntaxElement) -> usize {
    match e {
        SyntaxElement::Token(t) => t.start(),
        SyntaxElement::Node(n) => n.start(),
    }
}

fn element_end(e: &SyntaxElement) -> usize {
    match e {
        SyntaxElement::Token(t) => t.end(),
        SyntaxElement::Node(n) => n.end(),
    }
}

/// Concrete syntax tree of one source unit plus the errors recovered from.
#[derive(Clone, Debug)]
pub struct SyntaxTree {
    pub root: SyntaxNode,
    pub errors: Vec<ParseError>,
}
