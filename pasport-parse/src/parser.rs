#![forbid(unsafe_code)]

use std::mem;

use pasport_lex::{Token, TokenKind};
use tracing::debug;

use crate::error::ParseError;
use crate::syntax::{SyntaxElement, SyntaxKind, SyntaxNode, SyntaxTree};

static EOF: TokenKind = TokenKind::Eof;

const VISIBILITY: &[&str] = &["private", "protected", "public", "published", "automated"];

const DIRECTIVES: &[&str] = &[
    "abstract", "assembler", "cdecl", "deprecated", "dispid", "dynamic", "experimental",
    "export", "external", "far", "final", "forward", "inline", "library", "message", "near",
    "overload", "override", "pascal", "platform", "register", "reintroduce", "safecall",
    "static", "stdcall", "varargs", "virtual", "winapi",
];

const PROPERTY_SPECIFIERS: &[&str] = &[
    "read", "write", "default", "nodefault", "stored", "index", "implements", "readonly",
    "writeonly", "dispid",
];

type PResult<T> = Result<T, ParseError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    None,
    Interface,
    Implementation,
}

#[derive(Clone, Copy, Debug)]
enum Sync {
    /// Skip to the next unit-level declaration.
    Decl,
    /// Skip past the next `;` inside a class body.
    Member,
    /// Skip to the end of the current statement.
    Stmt,
}

struct Frame {
    kind: SyntaxKind,
    children: Vec<SyntaxElement>,
}

/// Recursive-descent parser from tokens to a [`SyntaxTree`].
///
/// Errors never abort the unit: the failing declaration is wrapped in an
/// `Error` node and parsing resumes at the next declaration boundary.
pub struct Parser<'a> {
    tokens: &'a [Token],
    idx: usize,
    frames: Vec<Frame>,
    errors: Vec<ParseError>,
    section: Section,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            idx: 0,
            frames: Vec::new(),
            errors: Vec::new(),
            section: Section::None,
        }
    }

    pub fn parse_unit(mut self) -> SyntaxTree {
        self.start(SyntaxKind::Unit);
        while !self.at(&TokenKind::Eof) {
            let before = self.idx;
            if self.parse_top_level() {
                break;
            }
            if self.idx == before {
                self.error_token("unexpected token at unit level");
            }
        }

        while self.frames.len() > 1 {
            self.finish();
        }
        let root = match self.frames.pop() {
            Some(f) => SyntaxNode::new(f.kind, f.children, self.offset()),
            None => SyntaxNode::new(SyntaxKind::Unit, Vec::new(), 0),
        };
        SyntaxTree {
            root,
            errors: self.errors,
        }
    }

    // Returns true once the closing `end.` has been consumed.
    fn parse_top_level(&mut self) -> bool {
        match self.peek_kind() {
            TokenKind::KwUnit | TokenKind::KwProgram | TokenKind::KwLibrary => {
                self.guarded(Sync::Decl, Self::parse_unit_header)
            }
            TokenKind::KwInterface => {
                self.section = Section::Interface;
                self.bump();
            }
            TokenKind::KwImplementation => {
                self.section = Section::Implementation;
                self.bump();
            }
            TokenKind::KwUses => self.guarded(Sync::Decl, Self::parse_uses),
            TokenKind::KwType => self.guarded(Sync::Decl, Self::parse_type_section),
            k if k.is_decl_section() => self.guarded(Sync::Decl, Self::parse_local_decls),
            k if k.is_routine_keyword() => self.guarded(Sync::Decl, Self::parse_routine),
            TokenKind::KwClass if self.nth_kind(1).is_routine_keyword() => {
                self.guarded(Sync::Decl, Self::parse_routine)
            }
            TokenKind::KwInitialization | TokenKind::KwFinalization | TokenKind::KwBegin => {
                self.guarded(Sync::Decl, Self::parse_unit_section)
            }
            TokenKind::KwEnd => {
                self.bump();
                if self.at(&TokenKind::Dot) {
                    self.bump();
                    return true;
                }
            }
            TokenKind::Dot | TokenKind::Semi => self.bump(),
            _ => self.error_token("unexpected token at unit level"),
        }
        false
    }

    fn parse_unit_header(&mut self) -> PResult<()> {
        self.start(SyntaxKind::UnitHeader);
        self.bump();
        self.parse_dotted_name()?;
        if self.at(&TokenKind::LParen) {
            // program Foo(input, output);
            self.skip_balanced(&TokenKind::LParen, &TokenKind::RParen)?;
        }
        self.expect(TokenKind::Semi)?;
        self.finish();
        Ok(())
    }

    fn parse_uses(&mut self) -> PResult<()> {
        self.start(SyntaxKind::UsesClause);
        self.bump();
        loop {
            self.parse_dotted_name()?;
            if self.at(&TokenKind::KwIn) {
                self.bump();
                self.expect(TokenKind::Str(String::new()))?;
            }
            if self.at(&TokenKind::Comma) {
                self.bump();
                continue;
            }
            break;
        }
        self.expect(TokenKind::Semi)?;
        self.finish();
        Ok(())
    }

    fn parse_type_section(&mut self) -> PResult<()> {
        self.bump();
        while self.at_ident() && matches!(self.nth_kind(1), TokenKind::Eq | TokenKind::Lt) {
            let before = self.idx;
            self.guarded(Sync::Decl, Self::parse_type_decl);
            if self.idx == before {
                break;
            }
        }
        Ok(())
    }

    fn parse_type_decl(&mut self) -> PResult<()> {
        self.start(SyntaxKind::TypeDecl);
        self.expect_ident()?;
        if self.at(&TokenKind::Lt) {
            self.skip_balanced(&TokenKind::Lt, &TokenKind::Gt)?;
        }
        self.expect(TokenKind::Eq)?;
        if self.at(&TokenKind::KwType) {
            self.bump();
        }

        match self.peek_kind() {
            TokenKind::KwClass => match self.nth_kind(1) {
                // Forward declaration.
                TokenKind::Semi => self.bump(),
                TokenKind::KwOf => self.skip_until_semi(),
                _ => self.parse_class_type()?,
            },
            TokenKind::KwRecord => self.parse_class_type()?,
            TokenKind::Ident(w)
                if w.eq_ignore_ascii_case("packed")
                    && matches!(self.nth_kind(1), TokenKind::KwRecord | TokenKind::KwClass) =>
            {
                self.bump();
                self.parse_class_type()?;
            }
            TokenKind::KwInterface => {
                self.bump();
                if !self.at(&TokenKind::Semi) {
                    self.skip_until_end()?;
                }
            }
            _ => {}
        }

        // Type expressions and hint directives.
        self.skip_until_semi();
        self.expect(TokenKind::Semi)?;
        self.finish();
        Ok(())
    }

    fn parse_class_type(&mut self) -> PResult<()> {
        self.start(SyntaxKind::ClassType);
        let is_record = self.at(&TokenKind::KwRecord);
        self.bump();

        while self.at_word("abstract") || self.at_word("sealed") {
            self.bump();
        }
        if self.at(&TokenKind::LParen) {
            self.start(SyntaxKind::Heritage);
            self.skip_balanced(&TokenKind::LParen, &TokenKind::RParen)?;
            self.finish();
        }
        if !is_record && self.at(&TokenKind::Semi) {
            // TFoo = class(TBase);
            self.finish();
            return Ok(());
        }

        while !self.at(&TokenKind::KwEnd) && !self.at(&TokenKind::Eof) {
            let before = self.idx;
            self.guarded(Sync::Member, Self::parse_member);
            if self.idx == before {
                self.error_token("unexpected token in class body");
            }
        }
        self.expect(TokenKind::KwEnd)?;
        self.finish();
        Ok(())
    }

    fn parse_member(&mut self) -> PResult<()> {
        match self.peek_kind() {
            TokenKind::Ident(w) if w.eq_ignore_ascii_case("strict") => {
                self.bump();
                self.bump();
            }
            TokenKind::Ident(w) if VISIBILITY.iter().any(|v| w.eq_ignore_ascii_case(v)) => {
                self.bump();
            }
            TokenKind::KwProperty => self.parse_property()?,
            TokenKind::KwClass => match self.nth_kind(1) {
                k if k.is_routine_keyword() => {
                    self.parse_routine_heading()?;
                }
                TokenKind::KwProperty | TokenKind::KwVar => self.bump(),
                _ => return Err(self.error_here("unexpected 'class' in class body")),
            },
            k if k.is_routine_keyword() => {
                self.parse_routine_heading()?;
            }
            TokenKind::KwVar | TokenKind::KwConst | TokenKind::KwType | TokenKind::Semi => {
                self.bump()
            }
            TokenKind::KwCase => {
                // Variant part; shares the record's `end`.
                while !self.at(&TokenKind::KwEnd) && !self.at(&TokenKind::Eof) {
                    if self.at(&TokenKind::LParen) {
                        self.skip_balanced(&TokenKind::LParen, &TokenKind::RParen)?;
                    } else {
                        self.bump();
                    }
                }
            }
            TokenKind::Ident(_) if matches!(self.nth_kind(1), TokenKind::Eq) => {
                // Class constants and nested type declarations.
                self.skip_until_semi();
                if self.at(&TokenKind::Semi) {
                    self.bump();
                }
            }
            TokenKind::Ident(_) => self.parse_field_decl()?,
            _ => return Err(self.error_here("unexpected token in class body")),
        }
        Ok(())
    }

    fn parse_field_decl(&mut self) -> PResult<()> {
        self.start(SyntaxKind::FieldDecl);
        self.expect_ident()?;
        while self.at(&TokenKind::Comma) {
            self.bump();
            self.expect_ident()?;
        }
        self.expect(TokenKind::Colon)?;
        self.parse_type_ref(|t| matches!(t.kind, TokenKind::Semi | TokenKind::KwEnd));
        if self.at(&TokenKind::Semi) {
            self.bump();
        }
        self.finish();
        Ok(())
    }

    fn parse_property(&mut self) -> PResult<()> {
        self.start(SyntaxKind::PropertyDecl);
        self.bump();
        self.expect_ident()?;
        if self.at(&TokenKind::LBracket) {
            self.skip_balanced(&TokenKind::LBracket, &TokenKind::RBracket)?;
        }
        if self.at(&TokenKind::Colon) {
            self.bump();
            self.parse_type_ref(|t| {
                matches!(t.kind, TokenKind::Semi)
                    || PROPERTY_SPECIFIERS.iter().any(|s| t.is_word(s))
            });
        }
        while !self.at(&TokenKind::Semi) && !self.at(&TokenKind::Eof) {
            self.bump();
        }
        self.expect(TokenKind::Semi)?;
        if self.at_word("default") && matches!(self.nth_kind(1), TokenKind::Semi) {
            self.bump();
            self.bump();
        }
        self.finish();
        Ok(())
    }

    /// Parses a routine heading and its directives. Returns true for
    /// `forward`/`external` routines, which never have a body.
    fn parse_routine_heading(&mut self) -> PResult<bool> {
        self.start(SyntaxKind::RoutineHeading);
        if self.at(&TokenKind::KwClass) {
            self.bump();
        }
        if !self.peek_kind().is_routine_keyword() {
            return Err(self.error_here("expected procedure, function, constructor or destructor"));
        }
        self.bump();
        self.expect_ident()?;
        loop {
            if self.at(&TokenKind::Lt) {
                self.skip_balanced(&TokenKind::Lt, &TokenKind::Gt)?;
            }
            if self.at(&TokenKind::Dot) && matches!(self.nth_kind(1), TokenKind::Ident(_)) {
                self.bump();
                self.bump();
            } else {
                break;
            }
        }
        if self.at(&TokenKind::LParen) {
            self.parse_formal_params()?;
        }
        if self.at(&TokenKind::Colon) {
            self.bump();
            self.parse_type_ref(|t| matches!(t.kind, TokenKind::Semi | TokenKind::KwEnd));
        }
        if self.at(&TokenKind::Eq) {
            // Method resolution clause.
            self.skip_until_semi();
        }
        if self.at(&TokenKind::Semi) {
            self.bump();
        }

        let mut bodiless = false;
        while self.at_directive() {
            if self.at_word("forward") || self.at_word("external") {
                bodiless = true;
            }
            self.bump();
            while !self.at(&TokenKind::Semi) && !self.at(&TokenKind::Eof) {
                self.bump();
            }
            if self.at(&TokenKind::Semi) {
                self.bump();
            }
        }
        self.finish();
        Ok(bodiless)
    }

    fn parse_formal_params(&mut self) -> PResult<()> {
        self.start(SyntaxKind::FormalParams);
        self.skip_balanced(&TokenKind::LParen, &TokenKind::RParen)?;
        self.finish();
        Ok(())
    }

    fn parse_routine(&mut self) -> PResult<()> {
        self.start(SyntaxKind::RoutineDecl);
        let bodiless = self.parse_routine_heading()?;

        if !bodiless && self.section != Section::Interface {
            loop {
                match self.peek_kind() {
                    k if k.is_decl_section() => self.parse_local_decls()?,
                    k if k.is_routine_keyword() => self.parse_routine()?,
                    TokenKind::KwClass if self.nth_kind(1).is_routine_keyword() => {
                        self.parse_routine()?
                    }
                    _ => break,
                }
            }
            match self.peek_kind() {
                TokenKind::KwBegin => self.parse_compound()?,
                TokenKind::KwAsm => self.parse_asm()?,
                _ => {}
            }
            if self.at(&TokenKind::Semi) {
                self.bump();
            }
        }
        self.finish();
        Ok(())
    }

    fn parse_local_decls(&mut self) -> PResult<()> {
        self.start(SyntaxKind::LocalDecls);
        self.bump();
        let mut depth = 0usize;
        let mut records = 0usize;
        loop {
            let prev_is_type_position = self.idx > 0
                && self
                    .tokens
                    .get(self.idx - 1)
                    .is_some_and(|t| matches!(t.kind, TokenKind::Colon | TokenKind::Eq));
            let kind = self.peek_kind();
            let boundary = depth == 0
                && records == 0
                && match kind {
                    TokenKind::Eof
                    | TokenKind::KwBegin
                    | TokenKind::KwAsm
                    | TokenKind::KwEnd
                    | TokenKind::KwImplementation
                    | TokenKind::KwInitialization
                    | TokenKind::KwFinalization => true,
                    k if k.is_decl_section() => true,
                    k if k.is_routine_keyword() => !prev_is_type_position,
                    TokenKind::KwClass => self.nth_kind(1).is_routine_keyword(),
                    _ => false,
                };
            if boundary || self.at(&TokenKind::Eof) {
                break;
            }
            match kind {
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
                TokenKind::KwRecord => records += 1,
                TokenKind::KwEnd => records = records.saturating_sub(1),
                _ => {}
            }
            self.bump();
        }
        self.finish();
        Ok(())
    }

    fn parse_unit_section(&mut self) -> PResult<()> {
        self.start(SyntaxKind::UnitSection);
        if self.at(&TokenKind::KwBegin) {
            self.parse_compound()?;
        } else {
            self.bump();
            self.parse_stmt_list(&[TokenKind::KwFinalization, TokenKind::KwEnd])?;
        }
        self.finish();
        Ok(())
    }

    fn parse_type_ref(&mut self, stop: impl Fn(&Token) -> bool) {
        self.start(SyntaxKind::TypeRef);
        let mut depth = 0usize;
        while let Some(tok) = self.tokens.get(self.idx) {
            if tok.kind == TokenKind::Eof || (depth == 0 && stop(tok)) {
                break;
            }
            match tok.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::Lt | TokenKind::KwRecord => {
                    depth += 1
                }
                TokenKind::RParen | TokenKind::RBracket | TokenKind::Gt | TokenKind::KwEnd => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
            self.bump();
        }
        self.finish();
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> PResult<()> {
        match self.peek_kind() {
            TokenKind::KwBegin => self.parse_compound(),
            TokenKind::KwIf => {
                self.start(SyntaxKind::IfStmt);
                self.bump();
                self.parse_expr(&[TokenKind::KwThen]);
                self.expect(TokenKind::KwThen)?;
                self.parse_statement()?;
                if self.at(&TokenKind::KwElse) {
                    self.bump();
                    self.parse_statement()?;
                }
                self.finish();
                Ok(())
            }
            TokenKind::KwWhile => self.parse_headed(SyntaxKind::WhileStmt),
            TokenKind::KwFor => self.parse_headed(SyntaxKind::ForStmt),
            TokenKind::KwWith => self.parse_headed(SyntaxKind::WithStmt),
            TokenKind::KwCase => self.parse_case(),
            TokenKind::KwRepeat => {
                self.start(SyntaxKind::RepeatStmt);
                self.bump();
                self.parse_stmt_list(&[TokenKind::KwUntil])?;
                self.expect(TokenKind::KwUntil)?;
                self.parse_expr(&[]);
                self.finish();
                Ok(())
            }
            TokenKind::KwTry => self.parse_try(),
            TokenKind::KwAsm => self.parse_asm(),
            // Empty statement.
            k if is_stmt_terminator(k) || matches!(k, TokenKind::Eof) => Ok(()),
            _ => {
                self.start(SyntaxKind::SimpleStmt);
                self.consume_run(&[]);
                self.finish();
                Ok(())
            }
        }
    }

    // while/for/with: keyword, header expression, `do`, statement.
    fn parse_headed(&mut self, kind: SyntaxKind) -> PResult<()> {
        self.start(kind);
        self.bump();
        self.parse_expr(&[TokenKind::KwDo]);
        self.expect(TokenKind::KwDo)?;
        self.parse_statement()?;
        self.finish();
        Ok(())
    }

    fn parse_compound(&mut self) -> PResult<()> {
        self.start(SyntaxKind::CompoundStmt);
        self.expect(TokenKind::KwBegin)?;
        self.parse_stmt_list(&[TokenKind::KwEnd])?;
        self.expect(TokenKind::KwEnd)?;
        self.finish();
        Ok(())
    }

    fn parse_case(&mut self) -> PResult<()> {
        self.start(SyntaxKind::CaseStmt);
        self.bump();
        self.parse_expr(&[TokenKind::KwOf]);
        self.expect(TokenKind::KwOf)?;
        loop {
            let before = self.idx;
            match self.peek_kind() {
                TokenKind::KwEnd | TokenKind::Eof => break,
                TokenKind::KwElse => {
                    self.bump();
                    self.parse_stmt_list(&[TokenKind::KwEnd])?;
                }
                TokenKind::Semi => self.bump(),
                _ => {
                    self.start(SyntaxKind::CaseArm);
                    self.parse_expr(&[TokenKind::Colon]);
                    self.expect(TokenKind::Colon)?;
                    self.parse_statement()?;
                    self.finish();
                }
            }
            if self.idx == before {
                return Err(self.error_here("unexpected token in case statement"));
            }
        }
        self.expect(TokenKind::KwEnd)?;
        self.finish();
        Ok(())
    }

    fn parse_try(&mut self) -> PResult<()> {
        self.start(SyntaxKind::TryStmt);
        self.bump();
        self.parse_stmt_list(&[TokenKind::KwExcept, TokenKind::KwFinally])?;
        match self.peek_kind() {
            TokenKind::KwExcept => {
                self.bump();
                while self.at_word("on") {
                    self.bump();
                    self.parse_expr(&[TokenKind::KwDo]);
                    self.expect(TokenKind::KwDo)?;
                    self.parse_statement()?;
                    if self.at(&TokenKind::Semi) {
                        self.bump();
                    }
                }
                if self.at(&TokenKind::KwElse) {
                    self.bump();
                }
                self.parse_stmt_list(&[TokenKind::KwEnd])?;
            }
            TokenKind::KwFinally => {
                self.bump();
                self.parse_stmt_list(&[TokenKind::KwEnd])?;
            }
            _ => return Err(self.error_here("expected 'except' or 'finally'")),
        }
        self.expect(TokenKind::KwEnd)?;
        self.finish();
        Ok(())
    }

    fn parse_asm(&mut self) -> PResult<()> {
        self.start(SyntaxKind::SimpleStmt);
        self.bump();
        while !self.at(&TokenKind::KwEnd) && !self.at(&TokenKind::Eof) {
            self.bump();
        }
        self.expect(TokenKind::KwEnd)?;
        self.finish();
        Ok(())
    }

    fn parse_stmt_list(&mut self, stops: &[TokenKind]) -> PResult<()> {
        loop {
            if self.at(&TokenKind::Eof) || self.at_any(stops) {
                return Ok(());
            }
            let before = self.idx;
            self.guarded(Sync::Stmt, Self::parse_statement);
            if self.at(&TokenKind::Semi) {
                self.bump();
                continue;
            }
            if self.at(&TokenKind::Eof) || self.at_any(stops) {
                return Ok(());
            }
            if self.idx == before {
                self.error_token("unexpected token in statement list");
            } else {
                let err = self.error_here("expected ';' between statements");
                self.errors.push(err);
            }
        }
    }

    fn parse_expr(&mut self, stops: &[TokenKind]) {
        self.start(SyntaxKind::Expr);
        self.consume_run(stops);
        self.finish();
    }

    // Consumes tokens up to a statement terminator or one of `stops`, outside brackets.
    fn consume_run(&mut self, stops: &[TokenKind]) {
        let mut depth = 0usize;
        loop {
            let kind = self.peek_kind();
            if matches!(kind, TokenKind::Eof) {
                break;
            }
            if depth == 0 && (is_stmt_terminator(kind) || self.at_any(stops)) {
                break;
            }
            match kind {
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.bump();
        }
    }

    // ---- recovery ----

    fn guarded(&mut self, sync: Sync, f: impl FnOnce(&mut Self) -> PResult<()>) {
        let depth = self.frames.len();
        let start = self.idx;
        let Err(err) = f(self) else {
            return;
        };

        debug!(message = %err.message, offset = err.span.offset(), "recovering from parse error");
        self.errors.push(err);

        let mut children = Vec::new();
        while self.frames.len() > depth {
            let Some(mut frame) = self.frames.pop() else {
                break;
            };
            frame.children.extend(children);
            children = frame.children;
        }
        self.frames.push(Frame {
            kind: SyntaxKind::Error,
            children,
        });

        self.sync(sync);
        if self.idx == start {
            self.bump();
        }
        self.finish();
    }

    fn sync(&mut self, sync: Sync) {
        match sync {
            Sync::Decl => loop {
                let kind = self.peek_kind();
                let boundary = match kind {
                    TokenKind::Eof
                    | TokenKind::KwType
                    | TokenKind::KwUses
                    | TokenKind::KwInterface
                    | TokenKind::KwImplementation
                    | TokenKind::KwInitialization
                    | TokenKind::KwFinalization => true,
                    k if k.is_decl_section() || k.is_routine_keyword() => true,
                    TokenKind::KwEnd => matches!(self.nth_kind(1), TokenKind::Dot),
                    _ => false,
                };
                if boundary {
                    break;
                }
                self.bump();
            },
            Sync::Member => {
                let mut depth = 0usize;
                loop {
                    match self.peek_kind() {
                        TokenKind::Eof => break,
                        TokenKind::KwEnd if depth == 0 => break,
                        TokenKind::Semi if depth == 0 => {
                            self.bump();
                            break;
                        }
                        TokenKind::LParen | TokenKind::LBracket => depth += 1,
                        TokenKind::RParen | TokenKind::RBracket => {
                            depth = depth.saturating_sub(1)
                        }
                        _ => {}
                    }
                    self.bump();
                }
            }
            Sync::Stmt => {
                let mut depth = 0usize;
                loop {
                    let kind = self.peek_kind();
                    if matches!(kind, TokenKind::Eof) || (depth == 0 && is_stmt_terminator(kind)) {
                        break;
                    }
                    match kind {
                        TokenKind::KwBegin
                        | TokenKind::KwTry
                        | TokenKind::KwCase
                        | TokenKind::KwRepeat => depth += 1,
                        TokenKind::KwEnd | TokenKind::KwUntil => depth -= 1,
                        _ => {}
                    }
                    self.bump();
                }
            }
        }
    }

    fn error_token(&mut self, message: &str) {
        let err = self.error_here(message);
        debug!(message, offset = err.span.offset(), "skipping token");
        self.errors.push(err);
        self.start(SyntaxKind::Error);
        self.bump();
        self.finish();
    }

    fn error_here(&self, message: &str) -> ParseError {
        let found = self.peek_kind();
        ParseError {
            message: format!("{message} (found {found:?})"),
            span: self.peek_span(),
        }
    }

    // ---- token helpers ----

    fn parse_dotted_name(&mut self) -> PResult<()> {
        self.expect_ident()?;
        while self.at(&TokenKind::Dot) && matches!(self.nth_kind(1), TokenKind::Ident(_)) {
            self.bump();
            self.bump();
        }
        Ok(())
    }

    fn skip_balanced(&mut self, open: &TokenKind, close: &TokenKind) -> PResult<()> {
        let mut depth = 0usize;
        loop {
            if self.at(&TokenKind::Eof) {
                return Err(self.error_here("unbalanced brackets"));
            }
            if self.at(open) {
                depth += 1;
            } else if self.at(close) {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    self.bump();
                    return Ok(());
                }
            }
            self.bump();
        }
    }

    // Skips a structured type body through its matching `end`.
    fn skip_until_end(&mut self) -> PResult<()> {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return Err(self.error_here("missing 'end'")),
                TokenKind::KwRecord | TokenKind::KwCase => depth += 1,
                TokenKind::KwEnd if depth == 0 => {
                    self.bump();
                    return Ok(());
                }
                TokenKind::KwEnd => depth -= 1,
                _ => {}
            }
            self.bump();
        }
    }

    fn skip_until_semi(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return,
                TokenKind::Semi if depth == 0 => return,
                TokenKind::LParen | TokenKind::LBracket | TokenKind::KwRecord => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::KwEnd => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
            self.bump();
        }
    }

    fn start(&mut self, kind: SyntaxKind) {
        self.frames.push(Frame {
            kind,
            children: Vec::new(),
        });
    }

    fn finish(&mut self) {
        if self.frames.len() <= 1 {
            return;
        }
        let offset = self.offset();
        if let Some(frame) = self.frames.pop() {
            let node = SyntaxNode::new(frame.kind, frame.children, offset);
            if let Some(parent) = self.frames.last_mut() {
                parent.children.push(SyntaxElement::Node(node));
            }
        }
    }

    fn bump(&mut self) {
        let Some(tok) = self.tokens.get(self.idx) else {
            return;
        };
        if tok.kind == TokenKind::Eof {
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.children.push(SyntaxElement::Token(tok.clone()));
        }
        self.idx += 1;
    }

    fn expect(&mut self, expected: TokenKind) -> PResult<()> {
        if self.at(&expected) {
            self.bump();
            Ok(())
        } else {
            Err(self.error_here(&format!("expected {expected:?}")))
        }
    }

    fn expect_ident(&mut self) -> PResult<()> {
        if self.at_ident() {
            self.bump();
            Ok(())
        } else {
            Err(self.error_here("expected identifier"))
        }
    }

    fn at(&self, kind: &TokenKind) -> bool {
        mem::discriminant(self.peek_kind()) == mem::discriminant(kind)
    }

    fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.iter().any(|k| self.at(k))
    }

    fn at_ident(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Ident(_))
    }

    fn at_word(&self, word: &str) -> bool {
        self.tokens.get(self.idx).is_some_and(|t| t.is_word(word))
    }

    fn at_directive(&self) -> bool {
        let is_directive = self
            .tokens
            .get(self.idx)
            .is_some_and(|t| DIRECTIVES.iter().any(|d| t.is_word(d)));
        // `Static: Integer;` is a field, not a directive.
        is_directive && !matches!(self.nth_kind(1), TokenKind::Colon | TokenKind::Comma)
    }

    fn peek_kind(&self) -> &'a TokenKind {
        self.nth_kind(0)
    }

    fn nth_kind(&self, n: usize) -> &'a TokenKind {
        self.tokens.get(self.idx + n).map(|t| &t.kind).unwrap_or(&EOF)
    }

    fn peek_span(&self) -> pasport_ast::ByteSpan {
        self.tokens
            .get(self.idx)
            .map(|t| t.span)
            .unwrap_or_else(|| pasport_ast::byte_span(self.offset(), 0))
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.idx)
            .or_else(|| self.tokens.last())
            .map(|t| t.start())
            .unwrap_or(0)
    }
}

fn is_stmt_terminator(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Semi
            | TokenKind::KwEnd
            | TokenKind::KwElse
            | TokenKind::KwUntil
            | TokenKind::KwExcept
            | TokenKind::KwFinally
    )
}
