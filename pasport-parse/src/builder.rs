#![forbid(unsafe_code)]

//! Tree-walking construction of a [`Unit`] from a [`SyntaxTree`].

use pasport_ast::{Class, Field, LineIndex, ProcKind, Procedure, Property, Span, Stmt, StmtKind, Unit};
use pasport_lex::{Token, TokenKind};
use tracing::warn;

use crate::normalize_ws;
use crate::syntax::{SyntaxKind, SyntaxNode, SyntaxTree};

pub struct TreeBuilder<'s> {
    src: &'s str,
    lines: LineIndex,
    /// One statement list per open block; the bottom entry is the routine body.
    stack: Vec<Vec<Stmt>>,
}

impl<'s> TreeBuilder<'s> {
    pub fn new(src: &'s str) -> Self {
        Self {
            src,
            lines: LineIndex::new(src),
            stack: Vec::new(),
        }
    }

    pub fn build(mut self, tree: &SyntaxTree, fallback_name: &str) -> Unit {
        let mut unit = Unit::new(fallback_name);
        let mut routines = Vec::new();

        for node in tree.root.nodes() {
            match node.kind {
                SyntaxKind::UnitHeader => {
                    let name = dotted_name(node.tokens().skip(1));
                    if !name.is_empty() {
                        unit.name = name;
                    }
                }
                SyntaxKind::UsesClause => unit.uses.extend(uses_names(node)),
                SyntaxKind::TypeDecl => {
                    if let Some(class) = self.class(node) {
                        unit.classes.push(class);
                    }
                }
                SyntaxKind::RoutineDecl => {
                    if let Some(routine) = self.routine(node) {
                        routines.push(routine);
                    }
                }
                SyntaxKind::Error => {
                    warn!(
                        unit = %unit.name,
                        offset = node.start(),
                        "skipping unparsable declaration"
                    );
                }
                _ => {}
            }
        }

        // Classes declared after an implementation still receive it.
        for (owner, routine) in routines {
            unit.attach_implementation(owner.as_deref(), routine);
        }
        unit
    }

    fn span(&self, node: &SyntaxNode) -> Span {
        self.lines.span(node.start(), node.end())
    }

    fn class(&self, decl: &SyntaxNode) -> Option<Class> {
        let body = decl.child(SyntaxKind::ClassType)?;
        let name = decl.ident()?;

        let mut class = Class::new(name);
        class.span = self.span(decl);
        class.is_record = body.tokens().take(2).any(|t| t.kind == TokenKind::KwRecord);
        class.ancestor = body.child(SyntaxKind::Heritage).and_then(|h| {
            let first = dotted_name(h.tokens().skip(1));
            (!first.is_empty()).then_some(first)
        });

        for member in body.nodes() {
            match member.kind {
                SyntaxKind::FieldDecl => {
                    let type_name = self.type_text(member);
                    for name in member.tokens().take_while(|t| t.kind != TokenKind::Colon) {
                        if let TokenKind::Ident(name) = &name.kind {
                            class.fields.push(Field {
                                name: name.clone(),
                                type_name: type_name.clone(),
                                span: self.span(member),
                            });
                        }
                    }
                }
                SyntaxKind::PropertyDecl => {
                    if let Some(prop) = self.property(member) {
                        class.properties.push(prop);
                    }
                }
                SyntaxKind::RoutineHeading => {
                    let (_, method) = self.heading(member);
                    class.methods.push(method.with_span(self.span(member)));
                }
                _ => {}
            }
        }
        Some(class)
    }

    fn property(&self, decl: &SyntaxNode) -> Option<Property> {
        let name = decl.ident()?.to_string();
        let tokens: Vec<&Token> = decl.tokens().collect();
        let accessor = |word: &str| {
            tokens
                .iter()
                .position(|t| t.is_word(word))
                .map(|at| dotted_name(tokens[at + 1..].iter().copied()))
                .filter(|s| !s.is_empty())
        };
        Some(Property {
            name,
            type_name: self.type_text(decl),
            read: accessor("read"),
            write: accessor("write"),
        })
    }

    fn type_text(&self, node: &SyntaxNode) -> String {
        node.child(SyntaxKind::TypeRef)
            .map(|t| normalize_ws(t.text(self.src)))
            .unwrap_or_default()
    }

    /// Reads a routine heading into its owner prefix and a bodiless procedure.
    fn heading(&self, heading: &SyntaxNode) -> (Option<String>, Procedure) {
        let mut tokens = heading.tokens().skip_while(|t| t.kind == TokenKind::KwClass);
        let kind = match tokens.next().map(|t| &t.kind) {
            Some(TokenKind::KwFunction) => ProcKind::Function,
            Some(TokenKind::KwConstructor) => ProcKind::Constructor,
            Some(TokenKind::KwDestructor) => ProcKind::Destructor,
            _ => ProcKind::Procedure,
        };

        let mut parts: Vec<&str> = Vec::new();
        let mut generic_depth = 0usize;
        let mut want_ident = true;
        for tok in tokens {
            match &tok.kind {
                TokenKind::Lt => generic_depth += 1,
                TokenKind::Gt => generic_depth = generic_depth.saturating_sub(1),
                _ if generic_depth > 0 => {}
                TokenKind::Ident(part) if want_ident => {
                    parts.push(part);
                    want_ident = false;
                }
                TokenKind::Dot if !want_ident => want_ident = true,
                _ => break,
            }
        }
        let (owner, name) = match parts.split_last() {
            Some((name, owner)) if !owner.is_empty() => (Some(owner.join(".")), name.to_string()),
            Some((name, _)) => (None, name.to_string()),
            None => (None, String::new()),
        };

        let params = heading
            .child(SyntaxKind::FormalParams)
            .map(|p| {
                let text = p.text(self.src).trim();
                let text = text.strip_prefix('(').unwrap_or(text);
                text.strip_suffix(')').unwrap_or(text).to_string()
            })
            .unwrap_or_default();
        let return_type = self.type_text(heading);

        (owner, Procedure::heading(name, kind, &params, &return_type))
    }

    fn routine(&mut self, decl: &SyntaxNode) -> Option<(Option<String>, Procedure)> {
        let heading = decl.child(SyntaxKind::RoutineHeading)?;
        let (owner, proc) = self.heading(heading);
        if proc.name.is_empty() {
            return None;
        }
        let proc = proc.with_span(self.span(decl));

        if let Some(block) = decl.child(SyntaxKind::CompoundStmt) {
            let body = self.inner_text(block);
            let statements = self.statements(block);
            return Some((owner, proc.with_body(body, statements)));
        }
        let asm = decl
            .child(SyntaxKind::SimpleStmt)
            .filter(|s| s.first_token().is_some_and(|t| t.kind == TokenKind::KwAsm));
        if let Some(block) = asm {
            let body = self.inner_text(block);
            return Some((owner, proc.with_body(body, Vec::new())));
        }
        Some((owner, proc))
    }

    // Text strictly between a block's first token and its closing `end`.
    fn inner_text(&self, block: &SyntaxNode) -> &'s str {
        let start = block.first_token().map(Token::end).unwrap_or(block.start());
        let end = block.last_token().filter(|t| t.kind == TokenKind::KwEnd);
        let end = end.map(Token::start).unwrap_or(block.end());
        self.src.get(start..end.max(start)).unwrap_or("")
    }

    fn statements(&mut self, body: &SyntaxNode) -> Vec<Stmt> {
        self.stack.clear();
        self.stack.push(Vec::new());
        self.walk(body);
        self.stack.pop().unwrap_or_default()
    }

    fn walk(&mut self, node: &SyntaxNode) {
        match node.kind {
            kind if kind.is_block() => {
                self.stack.push(Vec::new());
                for child in node.nodes() {
                    self.walk(child);
                }
                self.exit_block(node);
            }
            SyntaxKind::CaseArm => {
                for child in node.nodes() {
                    self.walk(child);
                }
            }
            SyntaxKind::SimpleStmt => {
                let stmt = Stmt::simple(node.text(self.src), self.span(node));
                self.push(stmt);
            }
            _ => {}
        }
    }

    fn exit_block(&mut self, node: &SyntaxNode) {
        let body = self.stack.pop().unwrap_or_default();
        // The routine's own begin..end merges into the body list.
        if node.kind == SyntaxKind::CompoundStmt && self.stack.len() == 1 {
            if let Some(top) = self.stack.last_mut() {
                top.extend(body);
            }
            return;
        }

        let header = node
            .child(SyntaxKind::Expr)
            .map(|e| normalize_ws(e.text(self.src)))
            .unwrap_or_default();
        let kind = match node.kind {
            SyntaxKind::IfStmt => StmtKind::If { condition: header, body },
            SyntaxKind::WhileStmt => StmtKind::While { condition: header, body },
            SyntaxKind::ForStmt => StmtKind::For { header, body },
            SyntaxKind::WithStmt => StmtKind::With { subject: header, body },
            SyntaxKind::TryStmt => StmtKind::Try { body },
            SyntaxKind::CaseStmt => StmtKind::Case { selector: header, body },
            SyntaxKind::RepeatStmt => StmtKind::Repeat { condition: header, body },
            _ => StmtKind::Compound { body },
        };
        let stmt = Stmt::new(kind, self.span(node));
        self.push(stmt);
    }

    fn push(&mut self, stmt: Stmt) {
        if let Some(top) = self.stack.last_mut() {
            top.push(stmt);
        }
    }
}

// Reads `A.B.C` from the front of a token run.
fn dotted_name<'t>(tokens: impl IntoIterator<Item = &'t Token>) -> String {
    let mut name = String::new();
    let mut want_ident = true;
    for tok in tokens {
        match &tok.kind {
            TokenKind::Ident(part) if want_ident => {
                name.push_str(part);
                want_ident = false;
            }
            TokenKind::Dot if !want_ident => {
                name.push('.');
                want_ident = true;
            }
            _ => break,
        }
    }
    name.trim_end_matches('.').to_string()
}

fn uses_names(clause: &SyntaxNode) -> Vec<String> {
    let tokens: Vec<&Token> = clause.tokens().skip(1).collect();
    tokens
        .split(|t| matches!(t.kind, TokenKind::Comma | TokenKind::Semi))
        .map(|group| dotted_name(group.iter().copied()))
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_tree;

    fn build(src: &str) -> Unit {
        let tree = parse_tree(src).unwrap();
        assert!(tree.errors.is_empty(), "unexpected errors: {:?}", tree.errors);
        TreeBuilder::new(src).build(&tree, "Fallback")
    }

    const SERVICE: &str = r#"
unit PersonService;

interface

uses System.SysUtils, Model;

type
  TPersonService = class(TObject)
  private
    FCount: Integer;
  public
    procedure AddPerson(APerson : TPerson);
    function Count: Integer; virtual;
    property Total: Integer read FCount write FCount;
  end;

implementation

procedure TPersonService.AddPerson(APerson : TPerson);
begin
  with Module.mtPerson do
  begin
    Append;
    FieldByName('First').AsString := APerson.cFirst;
    Post;
  end;
end;

function TPersonService.Count: Integer;
begin
  Result := FCount;
end;

end.
"#;

    #[test]
    fn classes_and_members() {
        let unit = build(SERVICE);
        assert_eq!(unit.name, "PersonService");
        assert_eq!(unit.uses, vec!["System.SysUtils", "Model"]);

        let class = unit.class("TPersonService").unwrap();
        assert_eq!(class.ancestor.as_deref(), Some("TObject"));
        assert_eq!(class.fields.len(), 1);
        assert_eq!(class.fields[0].type_name, "Integer");
        assert_eq!(class.properties[0].read.as_deref(), Some("FCount"));
        assert_eq!(class.properties[0].write.as_deref(), Some("FCount"));

        let names: Vec<_> = class.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["AddPerson", "Count"]);
        assert!(class.methods.iter().all(|m| m.has_body));
        assert_eq!(class.methods[1].kind, ProcKind::Function);
        assert_eq!(class.methods[1].return_type, "Integer");
        assert!(unit.procedures.is_empty());
    }

    #[test]
    fn top_level_begin_end_is_not_wrapped() {
        let unit = build(SERVICE);
        let add = &unit.classes[0].methods[0];
        assert!(add.body.starts_with("with Module.mtPerson do"));
        assert!(add.body.ends_with("end;"));

        assert_eq!(add.statements.len(), 1);
        let StmtKind::With { subject, body } = &add.statements[0].kind else {
            panic!("expected with, got {:?}", add.statements[0].kind);
        };
        assert_eq!(subject, "Module.mtPerson");
        // The nested begin..end under `with` is wrapped.
        assert_eq!(body.len(), 1);
        let StmtKind::Compound { body } = &body[0].kind else {
            panic!("expected compound");
        };
        assert_eq!(body.len(), 3);
        assert!(matches!(&body[1].kind, StmtKind::Assign { target, .. } if target == "FieldByName('First').AsString"));
    }

    #[test]
    fn if_else_branches_share_one_body() {
        let unit = build(
            "program P;\nprocedure Run;\nbegin\n  if A then B else C;\n  X := 1;\nend;\nbegin\nend.",
        );
        let run = &unit.procedures[0];
        assert_eq!(run.statements.len(), 2);
        let StmtKind::If { condition, body } = &run.statements[0].kind else {
            panic!("expected if");
        };
        assert_eq!(condition, "A");
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn case_and_try_flatten_their_arms() {
        let unit = build(
            r#"unit U;
implementation
procedure Run(K: Integer);
begin
  case K of
    1: A;
    2: begin B; C; end;
  else
    D;
  end;
  try
    E;
  except
    on Ex: Exception do F;
  end;
end;
end."#,
        );
        let run = &unit.procedures[0];
        let StmtKind::Case { selector, body } = &run.statements[0].kind else {
            panic!("expected case");
        };
        assert_eq!(selector, "K");
        assert_eq!(body.len(), 3);
        assert!(matches!(body[1].kind, StmtKind::Compound { .. }));

        let StmtKind::Try { body } = &run.statements[1].kind else {
            panic!("expected try");
        };
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn spans_are_line_based() {
        let unit = build(SERVICE);
        let class = &unit.classes[0];
        assert_eq!(class.span.start.line, 9);
        assert!(class.methods[0].span.start.line > class.span.end.line);
    }

    #[test]
    fn forward_declarations_are_not_classes() {
        let unit = build("unit U;\ninterface\ntype\n  TFoo = class;\n  TKind = (kA, kB);\n  TFoo = class\n  end;\nimplementation\nend.");
        assert_eq!(unit.classes.len(), 1);
    }
}
