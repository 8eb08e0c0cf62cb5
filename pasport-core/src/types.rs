#![forbid(unsafe_code)]

use indexmap::IndexMap;

/// `Unit.Class`, the key of the type registry.
pub type QualifiedName = String;

const BUILTINS: &[&str] = &[
    "Integer", "Cardinal", "ShortInt", "SmallInt", "LongInt", "Int64", "Byte", "Word",
    "LongWord", "UInt64", "NativeInt", "NativeUInt", "Boolean", "ByteBool", "WordBool",
    "LongBool", "Char", "AnsiChar", "WideChar", "String", "AnsiString", "WideString",
    "UnicodeString", "ShortString", "Real", "Single", "Double", "Extended", "Comp",
    "Currency", "TDateTime", "TDate", "TTime", "Variant", "OleVariant", "Pointer", "TObject",
    "TStrings", "TStringList",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.iter().any(|b| b.eq_ignore_ascii_case(name))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SemanticType {
    Named {
        qualified_name: String,
    },
    Array {
        element: Box<SemanticType>,
    },
    Class {
        name: String,
        /// Field name to declared type, verbatim and in declaration order.
        fields: IndexMap<String, String>,
    },
    /// Neither registered nor built in. Keeps the declared spelling.
    Unresolved {
        declared: String,
    },
}

impl SemanticType {
    pub fn named(qualified_name: impl Into<String>) -> Self {
        SemanticType::Named {
            qualified_name: qualified_name.into(),
        }
    }

    pub fn unresolved(declared: impl Into<String>) -> Self {
        SemanticType::Unresolved {
            declared: declared.into(),
        }
    }

    /// The name written into IR documents. Never empty.
    pub fn type_name(&self) -> String {
        match self {
            SemanticType::Named { qualified_name } => qualified_name.clone(),
            SemanticType::Array { element } => format!("array of {}", element.type_name()),
            SemanticType::Class { name, .. } => name.clone(),
            SemanticType::Unresolved { declared } if declared.is_empty() => "object".to_string(),
            SemanticType::Unresolved { declared } => declared.clone(),
        }
    }

    /// [`type_name`](Self::type_name) without its unit qualifier.
    pub fn simple_name(&self) -> String {
        simple_name(&self.type_name()).to_string()
    }

    pub fn is_resolved(&self) -> bool {
        match self {
            SemanticType::Unresolved { .. } => false,
            SemanticType::Array { element } => element.is_resolved(),
            SemanticType::Named { .. } | SemanticType::Class { .. } => true,
        }
    }

    pub fn fields(&self) -> Option<&IndexMap<String, String>> {
        match self {
            SemanticType::Class { fields, .. } => Some(fields),
            _ => None,
        }
    }
}

/// Suffix after the last `.`.
pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}
