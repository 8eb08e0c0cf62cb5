#![forbid(unsafe_code)]

mod builder;
mod error;
mod parser;
mod scan;
mod syntax;

use std::fmt;
use std::str::FromStr;

use pasport_ast::Unit;
use pasport_lex::{LexError, Lexer};
use tracing::{debug, warn};

pub use builder::TreeBuilder;
pub use error::ParseError;
pub use parser::Parser;
pub use scan::Scanner;
pub use syntax::{SyntaxElement, SyntaxKind, SyntaxNode, SyntaxTree};

/// How a [`Unit`] is constructed from source text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Walk the concrete syntax tree.
    Tree,
    /// Match ordered regular expressions over the raw text.
    Scan,
    /// Tree, falling back to scanning when the source cannot be tokenized.
    #[default]
    Auto,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Tree => "tree",
            Strategy::Scan => "scan",
            Strategy::Auto => "auto",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tree" => Ok(Strategy::Tree),
            "scan" => Ok(Strategy::Scan),
            "auto" => Ok(Strategy::Auto),
            other => Err(format!("unknown strategy '{other}' (expected tree, scan or auto)")),
        }
    }
}

/// A built unit together with how it was built and what went wrong on the way.
#[derive(Clone, Debug)]
pub struct BuildOutput {
    pub unit: Unit,
    /// `Tree` or `Scan`; never `Auto`.
    pub strategy: Strategy,
    pub errors: Vec<ParseError>,
}

pub fn parse_tree(src: &str) -> Result<SyntaxTree, LexError> {
    let tokens = Lexer::new(src).lex()?;
    Ok(Parser::new(&tokens).parse_unit())
}

/// Builds one unit from source text. Never fails: unreadable declarations are
/// skipped and reported in [`BuildOutput::errors`].
pub fn build_unit(src: &str, fallback_name: &str, strategy: Strategy) -> BuildOutput {
    match strategy {
        Strategy::Scan => scan_unit(src, fallback_name, Vec::new()),
        Strategy::Tree | Strategy::Auto => match parse_tree(src) {
            Ok(tree) => {
                for err in &tree.errors {
                    warn!(unit = fallback_name, offset = err.span.offset(), "{err}");
                }
                let unit = TreeBuilder::new(src).build(&tree, fallback_name);
                let mut statements = 0;
                for (_, routine) in unit.routines() {
                    for stmt in &routine.statements {
                        stmt.visit(&mut |_| statements += 1);
                    }
                }
                debug!(unit = %unit.name, routines = unit.routines().count(), statements, "built unit");
                BuildOutput {
                    unit,
                    strategy: Strategy::Tree,
                    errors: tree.errors,
                }
            }
            Err(err) if strategy == Strategy::Auto => {
                warn!(unit = fallback_name, offset = err.span.offset(), "{err}; falling back to pattern scanning");
                scan_unit(src, fallback_name, vec![err.into()])
            }
            Err(err) => BuildOutput {
                unit: Unit::new(fallback_name),
                strategy: Strategy::Tree,
                errors: vec![err.into()],
            },
        },
    }
}

fn scan_unit(src: &str, fallback_name: &str, mut errors: Vec<ParseError>) -> BuildOutput {
    let unit = match Scanner::shared() {
        Ok(scanner) => scanner.scan(src, fallback_name),
        Err(err) => {
            errors.push(err);
            Unit::new(fallback_name)
        }
    };
    debug!(unit = %unit.name, classes = unit.classes.len(), procedures = unit.procedures.len(), "scanned unit");
    BuildOutput {
        unit,
        strategy: Strategy::Scan,
        errors,
    }
}

pub(crate) fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
