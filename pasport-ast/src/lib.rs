#![forbid(unsafe_code)]

mod lines;
mod params;

use miette::SourceSpan;
use serde::{Deserialize, Serialize};

pub use lines::{LineCol, LineIndex};
pub use params::{join_params, parse_params};

/// Byte range into a unit's source text, used for diagnostic labels.
pub type ByteSpan = SourceSpan;

pub fn byte_span(start: usize, len: usize) -> ByteSpan {
    SourceSpan::new(start.into(), len)
}

pub fn byte_span_between(start: usize, end: usize) -> ByteSpan {
    debug_assert!(end >= start);
    byte_span(start, end.saturating_sub(start))
}

/// Line/column range of a declaration. All-zero when the builder could not tell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: LineCol,
    pub end: LineCol,
}

impl Span {
    pub const fn zero() -> Self {
        Self {
            start: LineCol::new(0, 0),
            end: LineCol::new(0, 0),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uses: Vec<String>,
    pub classes: Vec<Class>,
    pub procedures: Vec<Procedure>,
}

impl Unit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.procedures.is_empty()
    }

    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut Class> {
        self.classes
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Top-level procedures followed by every class method, in declaration order.
    pub fn routines(&self) -> impl Iterator<Item = (Option<&Class>, &Procedure)> {
        self.procedures.iter().map(|p| (None, p)).chain(
            self.classes
                .iter()
                .flat_map(|c| c.methods.iter().map(move |m| (Some(c), m))),
        )
    }

    /// Attaches a routine found in the implementation part.
    ///
    /// `owner` is the class prefix of a `TClass.Method` implementation. The
    /// routine fills the first bodiless declaration with the same name; when
    /// nothing was declared it is appended. Methods of classes that live in
    /// another unit become top-level procedures named `TClass.Method`.
    pub fn attach_implementation(&mut self, owner: Option<&str>, routine: Procedure) {
        match owner {
            None => fill_or_push(&mut self.procedures, routine),
            Some(owner) => match self.class_mut(owner) {
                Some(class) => fill_or_push(&mut class.methods, routine),
                None => {
                    let mut routine = routine;
                    routine.name = format!("{owner}.{}", routine.name);
                    self.procedures.push(routine);
                }
            },
        }
    }
}

fn fill_or_push(slots: &mut Vec<Procedure>, routine: Procedure) {
    let declared = slots
        .iter_mut()
        .find(|p| !p.has_body && p.name.eq_ignore_ascii_case(&routine.name));
    match declared {
        Some(decl) if routine.has_body => decl.complete_with(routine),
        _ => slots.push(routine),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ancestor: Option<String>,
    #[serde(default)]
    pub is_record: bool,
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
    pub methods: Vec<Procedure>,
    #[serde(default)]
    pub span: Span,
}

impl Class {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub span: Span,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcKind {
    #[default]
    Procedure,
    Function,
    Constructor,
    Destructor,
}

impl ProcKind {
    pub fn from_keyword(word: &str) -> Option<Self> {
        const KINDS: [(&str, ProcKind); 4] = [
            ("procedure", ProcKind::Procedure),
            ("function", ProcKind::Function),
            ("constructor", ProcKind::Constructor),
            ("destructor", ProcKind::Destructor),
        ];
        KINDS
            .iter()
            .find(|(kw, _)| word.eq_ignore_ascii_case(kw))
            .map(|(_, kind)| *kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcKind::Procedure => "procedure",
            ProcKind::Function => "function",
            ProcKind::Constructor => "constructor",
            ProcKind::Destructor => "destructor",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Param {
    pub name: String,
    pub type_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Procedure {
    pub name: String,
    pub kind: ProcKind,
    pub parameters: Vec<Param>,
    /// Empty for procedures, constructors and destructors.
    pub return_type: String,
    pub has_body: bool,
    /// Raw text between the body's outermost `begin` and `end`.
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statements: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
}

impl Procedure {
    pub fn heading(name: impl Into<String>, kind: ProcKind, params: &str, return_type: &str) -> Self {
        Self {
            name: name.into(),
            kind,
            parameters: parse_params(params),
            return_type: return_type.trim().to_string(),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: &str, statements: Vec<Stmt>) -> Self {
        self.has_body = true;
        self.body = body.trim().to_string();
        self.statements = statements;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    // Delphi lets the implementation omit the parameter list of a declared routine.
    fn complete_with(&mut self, imp: Procedure) {
        if !imp.parameters.is_empty() {
            self.parameters = imp.parameters;
        }
        if !imp.return_type.is_empty() {
            self.return_type = imp.return_type;
        }
        self.kind = imp.kind;
        self.has_body = imp.has_body;
        self.body = imp.body;
        self.statements = imp.statements;
        self.span = imp.span;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stmt {
    #[serde(flatten)]
    pub kind: StmtKind,
    #[serde(default)]
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StmtKind {
    Compound { body: Vec<Stmt> },
    /// Then and else branches share one flattened body.
    If { condition: String, body: Vec<Stmt> },
    While { condition: String, body: Vec<Stmt> },
    For { header: String, body: Vec<Stmt> },
    With { subject: String, body: Vec<Stmt> },
    /// Protected, handler and finally statements share one flattened body.
    Try { body: Vec<Stmt> },
    Case { selector: String, body: Vec<Stmt> },
    Repeat { condition: String, body: Vec<Stmt> },
    Assign { target: String, value: String },
    Call { callee: String, arguments: String },
    Other { text: String },
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Classifies a simple (non block-forming) statement from its source text.
    pub fn simple(text: &str, span: Span) -> Self {
        let text = text.trim();
        let kind = if let Some(at) = find_top_level(text, ":=") {
            StmtKind::Assign {
                target: text[..at].trim().to_string(),
                value: text[at + 2..].trim().to_string(),
            }
        } else if is_call_shaped(text) {
            let (callee, arguments) = match (text.find('('), text.rfind(')')) {
                (Some(open), Some(close)) if close > open => {
                    (&text[..open], &text[open + 1..close])
                }
                _ => (text, ""),
            };
            StmtKind::Call {
                callee: callee.trim().to_string(),
                arguments: arguments.trim().to_string(),
            }
        } else {
            StmtKind::Other {
                text: text.to_string(),
            }
        };
        Self { kind, span }
    }

    pub fn body(&self) -> Option<&[Stmt]> {
        match &self.kind {
            StmtKind::Compound { body }
            | StmtKind::If { body, .. }
            | StmtKind::While { body, .. }
            | StmtKind::For { body, .. }
            | StmtKind::With { body, .. }
            | StmtKind::Try { body }
            | StmtKind::Case { body, .. }
            | StmtKind::Repeat { body, .. } => Some(body),
            StmtKind::Assign { .. } | StmtKind::Call { .. } | StmtKind::Other { .. } => None,
        }
    }

    /// Pre-order traversal over this statement and everything nested in it.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Stmt)) {
        f(self);
        if let Some(body) = self.body() {
            for s in body {
                s.visit(f);
            }
        }
    }
}

fn is_call_shaped(text: &str) -> bool {
    let head = text.split('(').next().unwrap_or("").trim();
    !head.is_empty()
        && head
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == ' ')
}

// Finds `needle` outside string literals and brackets.
fn find_top_level(text: &str, needle: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if b == b'\'' {
                in_string = false;
            }
        } else {
            match b {
                b'\'' => in_string = true,
                b'(' | b'[' => depth += 1,
                b')' | b']' => depth -= 1,
                _ if depth == 0 && bytes[i..].starts_with(needle.as_bytes()) => return Some(i),
                _ => {}
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(name: &str) -> Procedure {
        Procedure::heading(name, ProcKind::Procedure, "APerson : TPerson", "")
    }

    #[test]
    fn implementation_fills_class_declaration() {
        let mut unit = Unit::new("Model");
        let mut class = Class::new("TPersonService");
        class.methods.push(declared("AddPerson"));
        unit.classes.push(class);

        let imp = Procedure::heading("AddPerson", ProcKind::Procedure, "", "")
            .with_body("  Post;  ", Vec::new());
        unit.attach_implementation(Some("tpersonservice"), imp);

        let method = &unit.classes[0].methods[0];
        assert!(method.has_body);
        assert_eq!(method.body, "Post;");
        assert_eq!(method.parameters.len(), 1, "declared parameters survive");
        assert_eq!(unit.classes[0].methods.len(), 1);
    }

    #[test]
    fn implementation_of_foreign_class_becomes_qualified_procedure() {
        let mut unit = Unit::new("Main");
        let imp = Procedure::heading("Run", ProcKind::Procedure, "", "").with_body("", Vec::new());
        unit.attach_implementation(Some("TOther"), imp);
        assert_eq!(unit.procedures[0].name, "TOther.Run");
    }

    #[test]
    fn simple_statements_are_classified() {
        let s = Stmt::simple("Person := TPerson.Create(a, b)", Span::zero());
        assert_eq!(
            s.kind,
            StmtKind::Assign {
                target: "Person".into(),
                value: "TPerson.Create(a, b)".into()
            }
        );

        let s = Stmt::simple("ShowMessage('a := b')", Span::zero());
        assert_eq!(
            s.kind,
            StmtKind::Call {
                callee: "ShowMessage".into(),
                arguments: "'a := b'".into()
            }
        );

        let s = Stmt::simple("Post", Span::zero());
        assert!(matches!(s.kind, StmtKind::Call { ref callee, .. } if callee == "Post"));
    }

    #[test]
    fn stmt_json_uses_kind_discriminator() {
        let s = Stmt::new(
            StmtKind::With {
                subject: "Module.mtPerson".into(),
                body: vec![Stmt::simple("Append", Span::zero())],
            },
            Span::zero(),
        );
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["kind"], "with");
        assert_eq!(json["body"][0]["kind"], "call");
    }

    #[test]
    fn visit_is_pre_order() {
        let s = Stmt::new(
            StmtKind::Try {
                body: vec![
                    Stmt::new(
                        StmtKind::If {
                            condition: "Ok".into(),
                            body: vec![Stmt::simple("Post", Span::zero())],
                        },
                        Span::zero(),
                    ),
                    Stmt::simple("Cancel", Span::zero()),
                ],
            },
            Span::zero(),
        );
        let mut seen = Vec::new();
        s.visit(&mut |stmt| {
            seen.push(match &stmt.kind {
                StmtKind::Try { .. } => "try",
                StmtKind::If { .. } => "if",
                StmtKind::Call { callee, .. } => callee.as_str(),
                _ => "other",
            })
        });
        assert_eq!(seen, vec!["try", "if", "Post", "Cancel"]);
    }

    #[test]
    fn proc_kind_keywords_are_case_insensitive() {
        assert_eq!(ProcKind::from_keyword("CONSTRUCTOR"), Some(ProcKind::Constructor));
        assert_eq!(ProcKind::from_keyword("begin"), None);
    }
}
