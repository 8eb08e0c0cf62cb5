#![forbid(unsafe_code)]

use pasport_ast::ByteSpan;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: ByteSpan,
}

impl Token {
    pub fn start(&self) -> usize {
        self.span.offset()
    }

    pub fn end(&self) -> usize {
        self.span.offset() + self.span.len()
    }

    /// True for an identifier spelled `word`, ignoring ASCII case.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(s) if s.eq_ignore_ascii_case(word))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Reserved words
    KwUnit,
    KwProgram,
    KwLibrary,
    KwInterface,
    KwImplementation,
    KwUses,
    KwType,
    KwClass,
    KwRecord,
    KwBegin,
    KwEnd,
    KwProcedure,
    KwFunction,
    KwConstructor,
    KwDestructor,
    KwProperty,
    KwVar,
    KwConst,
    KwResourcestring,
    KwThreadvar,
    KwLabel,
    KwIf,
    KwThen,
    KwElse,
    KwWhile,
    KwDo,
    KwFor,
    KwTo,
    KwDownto,
    KwIn,
    KwWith,
    KwTry,
    KwExcept,
    KwFinally,
    KwCase,
    KwOf,
    KwRepeat,
    KwUntil,
    KwRaise,
    KwInherited,
    KwInitialization,
    KwFinalization,
    KwArray,
    KwSet,
    KwAsm,
    KwNil,
    KwAnd,
    KwOr,
    KwXor,
    KwNot,
    KwDiv,
    KwMod,
    KwShl,
    KwShr,
    KwIs,
    KwAs,

    // Operators / punctuation
    Assign,
    Colon,
    Semi,
    Comma,
    Dot,
    DotDot,
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    At,
    LParen,
    RParen,
    LBracket,
    RBracket,

    Eof,

    // Literals / identifiers
    Ident(String),
    Number(String),
    Str(String),
    CharCode(String),
}

impl TokenKind {
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word.to_ascii_lowercase().as_str() {
            "unit" => TokenKind::KwUnit,
            "program" => TokenKind::KwProgram,
            "library" => TokenKind::KwLibrary,
            "interface" => TokenKind::KwInterface,
            "implementation" => TokenKind::KwImplementation,
            "uses" => TokenKind::KwUses,
            "type" => TokenKind::KwType,
            "class" => TokenKind::KwClass,
            "record" => TokenKind::KwRecord,
            "begin" => TokenKind::KwBegin,
            "end" => TokenKind::KwEnd,
            "procedure" => TokenKind::KwProcedure,
            "function" => TokenKind::KwFunction,
            "constructor" => TokenKind::KwConstructor,
            "destructor" => TokenKind::KwDestructor,
            "property" => TokenKind::KwProperty,
            "var" => TokenKind::KwVar,
            "const" => TokenKind::KwConst,
            "resourcestring" => TokenKind::KwResourcestring,
            "threadvar" => TokenKind::KwThreadvar,
            "label" => TokenKind::KwLabel,
            "if" => TokenKind::KwIf,
            "then" => TokenKind::KwThen,
            "else" => TokenKind::KwElse,
            "while" => TokenKind::KwWhile,
            "do" => TokenKind::KwDo,
            "for" => TokenKind::KwFor,
            "to" => TokenKind::KwTo,
            "downto" => TokenKind::KwDownto,
            "in" => TokenKind::KwIn,
            "with" => TokenKind::KwWith,
            "try" => TokenKind::KwTry,
            "except" => TokenKind::KwExcept,
            "finally" => TokenKind::KwFinally,
            "case" => TokenKind::KwCase,
            "of" => TokenKind::KwOf,
            "repeat" => TokenKind::KwRepeat,
            "until" => TokenKind::KwUntil,
            "raise" => TokenKind::KwRaise,
            "inherited" => TokenKind::KwInherited,
            "initialization" => TokenKind::KwInitialization,
            "finalization" => TokenKind::KwFinalization,
            "array" => TokenKind::KwArray,
            "set" => TokenKind::KwSet,
            "asm" => TokenKind::KwAsm,
            "nil" => TokenKind::KwNil,
            "and" => TokenKind::KwAnd,
            "or" => TokenKind::KwOr,
            "xor" => TokenKind::KwXor,
            "not" => TokenKind::KwNot,
            "div" => TokenKind::KwDiv,
            "mod" => TokenKind::KwMod,
            "shl" => TokenKind::KwShl,
            "shr" => TokenKind::KwShr,
            "is" => TokenKind::KwIs,
            "as" => TokenKind::KwAs,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_routine_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::KwProcedure
                | TokenKind::KwFunction
                | TokenKind::KwConstructor
                | TokenKind::KwDestructor
        )
    }

    /// Keywords that open a section of declarations.
    pub fn is_decl_section(&self) -> bool {
        matches!(
            self,
            TokenKind::KwType
                | TokenKind::KwVar
                | TokenKind::KwConst
                | TokenKind::KwResourcestring
                | TokenKind::KwThreadvar
                | TokenKind::KwLabel
        )
    }
}
