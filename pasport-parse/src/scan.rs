#![forbid(unsafe_code)]

//! Pattern-scanning construction of a [`Unit`] from raw source text.
//!
//! Used when no token stream is available. Rules run in a fixed order over a
//! masked copy of the source in which comments and string contents are blanked,
//! so keywords inside them never match. Offsets in the masked copy equal
//! offsets in the source, and body text is always cut from the source.

use std::ops::Range;
use std::sync::OnceLock;

use pasport_ast::{byte_span, Class, Field, LineIndex, ProcKind, Procedure, Property, Unit};
use regex::Regex;
use tracing::debug;

use crate::error::ParseError;
use crate::normalize_ws;

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

pub struct Scanner {
    unit_header: Regex,
    uses: Regex,
    class_header: Regex,
    visibility: Regex,
    property: Regex,
    method: Regex,
    field: Regex,
    implementation: Regex,
    heading: Regex,
    block_word: Regex,
}

fn compile(pattern: &str) -> Result<Regex, ParseError> {
    Regex::new(pattern).map_err(|e| ParseError {
        message: format!("invalid scanner rule: {e}"),
        span: byte_span(0, 0),
    })
}

static SHARED: OnceLock<Result<Scanner, ParseError>> = OnceLock::new();

impl Scanner {
    /// Process-wide scanner; the rules compile once.
    pub fn shared() -> Result<&'static Scanner, ParseError> {
        SHARED.get_or_init(Scanner::new).as_ref().map_err(Clone::clone)
    }

    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            unit_header: compile(r"(?i)\b(?:unit|program|library)\s+([A-Za-z_][\w.]*)\s*[;(]")?,
            uses: compile(r"(?i)\buses\b([^;]*);")?,
            class_header: compile(
                r"(?i)\b([A-Za-z_]\w*)\s*=\s*(?:type\s+)?(?:packed\s+)?(class|record)\b",
            )?,
            visibility: compile(
                r"(?i)^(?:(?:strict\s+)?(?:private|protected|public|published|automated)\b\s*)+",
            )?,
            property: compile(r"(?is)^property\s+([A-Za-z_]\w*)\s*(?:\[[^\]]*\])?\s*(?::\s*(.*))?$")?,
            method: compile(
                r"(?is)^(?:class\s+)?(procedure|function|constructor|destructor)\s+([A-Za-z_][\w.]*)\s*(?:\((.*)\))?\s*(?::\s*(.+))?$",
            )?,
            field: compile(r"(?is)^([A-Za-z_]\w*(?:\s*,\s*[A-Za-z_]\w*)*)\s*:\s*(.+)$")?,
            implementation: compile(r"(?i)\bimplementation\b")?,
            heading: compile(
                r"(?i)\b(?:class\s+)?(procedure|function|constructor|destructor)\s+([A-Za-z_][\w.]*)",
            )?,
            block_word: compile(
                r"(?i)\b(begin|asm|case|try|record|end|procedure|function|constructor|destructor)\b",
            )?,
        })
    }

    pub fn scan(&self, src: &str, fallback_name: &str) -> Unit {
        let masked = mask(src);
        let lines = LineIndex::new(src);
        let mut unit = Unit::new(fallback_name);

        if let Some(caps) = self.unit_header.captures(&masked) {
            unit.name = caps[1].to_string();
        }
        for caps in self.uses.captures_iter(&masked) {
            unit.uses.extend(uses_names(&caps[1]));
        }

        let mut class_bodies: Vec<Range<usize>> = Vec::new();
        for caps in self.class_header.captures_iter(&masked) {
            let (Some(whole), Some(name), Some(kind)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let is_record = kind.as_str().eq_ignore_ascii_case("record");
            if class_bodies.iter().any(|r| r.contains(&whole.start())) {
                continue;
            }
            if let Some((class, body)) = self.class(&masked, &lines, name, whole.end(), is_record) {
                unit.classes.push(class);
                class_bodies.push(body);
            }
        }

        let split = self
            .implementation
            .find(&masked)
            .map(|m| m.start())
            .unwrap_or(0);

        let mut pos = 0;
        while let Some(caps) = self.heading.captures_at(&masked, pos) {
            let (Some(whole), Some(kind), Some(name)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                break;
            };
            pos = whole.end();
            if class_bodies.iter().any(|r| r.contains(&whole.start()))
                || is_type_position(&masked, whole.start())
            {
                continue;
            }

            let kind = ProcKind::from_keyword(kind.as_str()).unwrap_or_default();
            let rest = heading_rest(&masked, whole.end());
            let bodiless = rest.bodiless || whole.start() < split;
            let (owner, name) = match name.as_str().rsplit_once('.') {
                Some((owner, name)) => (Some(owner.to_string()), name.to_string()),
                None => (None, name.as_str().to_string()),
            };
            let routine = Procedure::heading(name, kind, &rest.params, &rest.return_type);

            let body = if bodiless { None } else { self.body(&masked, rest.end) };
            let routine = match body {
                Some(body) => {
                    pos = body.end;
                    let span_end = after_semicolon(&masked, body.end);
                    routine
                        .with_body(&src[body.inner], Vec::new())
                        .with_span(lines.span(whole.start(), span_end))
                }
                None => {
                    pos = pos.max(rest.end);
                    routine.with_span(lines.span(whole.start(), rest.end))
                }
            };
            debug!(unit = %unit.name, routine = %routine.name, "scanned routine");
            unit.attach_implementation(owner.as_deref(), routine);
        }
        unit
    }

    fn class(
        &self,
        masked: &str,
        lines: &LineIndex,
        name: regex::Match<'_>,
        header_end: usize,
        is_record: bool,
    ) -> Option<(Class, Range<usize>)> {
        let mut cursor = skip_ws(masked, header_end);
        let mut class = Class::new(name.as_str());
        class.is_record = is_record;

        if !is_record {
            let next_word = word_at(masked, cursor);
            if next_word.eq_ignore_ascii_case("of") {
                return None;
            }
            if next_word.eq_ignore_ascii_case("abstract") || next_word.eq_ignore_ascii_case("sealed") {
                cursor = skip_ws(masked, cursor + next_word.len());
            }
        }
        if masked[cursor..].starts_with('(') {
            let close = matching_paren(masked, cursor)?;
            let ancestors = &masked[cursor + 1..close];
            class.ancestor = ancestors
                .split(',')
                .next()
                .map(normalize_ws)
                .filter(|a| !a.is_empty());
            cursor = skip_ws(masked, close + 1);
        }
        if masked[cursor..].starts_with(';') {
            // `TFoo = class;` is a forward declaration; `TFoo = class(TBase);` is empty.
            if class.ancestor.is_none() && !is_record {
                return None;
            }
            class.span = lines.span(name.start(), cursor + 1);
            return Some((class, name.start()..cursor + 1));
        }

        let end = self.matching_end(masked, cursor)?;
        self.members(masked, lines, cursor..end.start, &mut class);
        let span_end = after_semicolon(masked, end.end);
        class.span = lines.span(name.start(), span_end);
        Some((class, name.start()..span_end))
    }

    // Finds the `end` closing a class or record body starting at `from`.
    fn matching_end(&self, masked: &str, from: usize) -> Option<Range<usize>> {
        let mut depth = 1usize;
        for m in self.block_word.find_iter(&masked[from..]) {
            let word = m.as_str().to_ascii_lowercase();
            match word.as_str() {
                "record" => depth += 1,
                "end" => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(from + m.start()..from + m.end());
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn members(&self, masked: &str, lines: &LineIndex, body: Range<usize>, class: &mut Class) {
        for segment in split_top_level(masked, body) {
            let raw = masked[segment.clone()].trim_end();
            let mut text = raw.trim_start();

            if let Some(m) = self.visibility.find(text) {
                text = text[m.end()..].trim_start();
            }
            let lead = word_at(text, 0);
            if ["class", "var", "const"].iter().any(|w| lead.eq_ignore_ascii_case(w)) {
                text = text[lead.len()..].trim_start();
            }
            if text.is_empty() {
                continue;
            }
            let start = segment.start + raw.len() - text.len();
            let first = word_at(text, 0);
            if first.eq_ignore_ascii_case("case") {
                // Variant part runs to the record's end.
                break;
            }
            let span = lines.span(start, segment.start + raw.len());

            if let Some(caps) = self.property.captures(text) {
                class.properties.push(property(&caps[1], caps.get(2).map_or("", |m| m.as_str())));
            } else if let Some(caps) = self.method.captures(text) {
                let kind = ProcKind::from_keyword(&caps[1]).unwrap_or_default();
                let params = caps.get(3).map_or("", |m| m.as_str());
                let return_type = caps.get(4).map_or(String::new(), |m| normalize_ws(m.as_str()));
                let name = caps[2].rsplit('.').next().unwrap_or_default().to_string();
                class
                    .methods
                    .push(Procedure::heading(name, kind, params, &return_type).with_span(span));
            } else if DIRECTIVES.iter().any(|d| first.eq_ignore_ascii_case(d)) {
                continue;
            } else if let Some(caps) = self.field.captures(text) {
                let type_name = normalize_ws(&caps[2]);
                for name in caps[1].split(',') {
                    class.fields.push(Field {
                        name: name.trim().to_string(),
                        type_name: type_name.clone(),
                        span,
                    });
                }
            } else {
                debug!(class = %class.name, member = %normalize_ws(text), "skipping class member");
            }
        }
    }

    // Locates a routine body after its heading, skipping local declarations
    // and nested routines. Returns the outer range and the text between
    // `begin` and the matching `end`.
    fn body(&self, masked: &str, from: usize) -> Option<Body> {
        #[derive(PartialEq)]
        enum Open {
            Record,
            Block,
        }

        let mut stack: Vec<Open> = Vec::new();
        let mut nested = 0usize;
        let mut begin: Option<usize> = None;

        for m in self.block_word.find_iter(&masked[from..]) {
            let at = from + m.start();
            let word = m.as_str().to_ascii_lowercase();
            match word.as_str() {
                "procedure" | "function" | "constructor" | "destructor" => {
                    if stack.is_empty() && begin.is_none() && !is_type_position(masked, at) {
                        nested += 1;
                    }
                }
                "record" => stack.push(Open::Record),
                "begin" | "asm" => {
                    if stack.is_empty() && nested == 0 && begin.is_none() {
                        begin = Some(from + m.end());
                    }
                    stack.push(Open::Block);
                }
                "case" => {
                    if stack.last() == Some(&Open::Block) {
                        stack.push(Open::Block);
                    }
                }
                "try" => stack.push(Open::Block),
                "end" => {
                    let closed = stack.pop()?;
                    if !stack.is_empty() {
                        continue;
                    }
                    if let Some(inner_start) = begin {
                        return Some(Body {
                            inner: inner_start..at,
                            end: from + m.end(),
                        });
                    }
                    if closed == Open::Block {
                        nested = nested.saturating_sub(1);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

struct Body {
    inner: Range<usize>,
    end: usize,
}

struct HeadingRest {
    params: String,
    return_type: String,
    bodiless: bool,
    /// Offset just past the heading and its directives.
    end: usize,
}

// Reads parameters, return type and directives following a routine name.
fn heading_rest(masked: &str, from: usize) -> HeadingRest {
    let mut cursor = skip_ws(masked, from);
    let mut params = String::new();
    if masked[cursor..].starts_with('(') {
        if let Some(close) = matching_paren(masked, cursor) {
            params = masked[cursor + 1..close].to_string();
            cursor = skip_ws(masked, close + 1);
        }
    }

    let semi = masked[cursor..].find(';').map_or(masked.len(), |i| cursor + i);
    let mut return_type = String::new();
    if masked[cursor..].starts_with(':') {
        return_type = normalize_ws(&masked[cursor + 1..semi]);
    }
    cursor = (semi + 1).min(masked.len());

    let mut bodiless = false;
    loop {
        let at = skip_ws(masked, cursor);
        let word = word_at(masked, at);
        if word.is_empty() || !DIRECTIVES.iter().any(|d| word.eq_ignore_ascii_case(d)) {
            break;
        }
        let after = skip_ws(masked, at + word.len());
        if masked[after..].starts_with([':', ',']) {
            break;
        }
        if word.eq_ignore_ascii_case("forward") || word.eq_ignore_ascii_case("external") {
            bodiless = true;
        }
        let semi = masked[at..].find(';').map_or(masked.len(), |i| at + i);
        cursor = (semi + 1).min(masked.len());
    }

    HeadingRest {
        params,
        return_type,
        bodiless,
        end: cursor,
    }
}

/// Blanks comments and the contents of string literals, keeping byte offsets
/// and line breaks.
fn mask(src: &str) -> String {
    let bytes = src.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;
    let blank = |out: &mut Vec<u8>, range: Range<usize>| {
        for b in &mut out[range] {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    };

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                let end = find_from(bytes, i + 1, b"}").map_or(bytes.len(), |e| e + 1);
                blank(&mut out, i..end);
                i = end;
            }
            b'(' if bytes.get(i + 1) == Some(&b'*') => {
                let end = find_from(bytes, i + 2, b"*)").map_or(bytes.len(), |e| e + 2);
                blank(&mut out, i..end);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = find_from(bytes, i, b"\n").unwrap_or(bytes.len());
                blank(&mut out, i..end);
                i = end;
            }
            b'\'' => {
                // '' inside a literal is an escaped quote; both halves stay blank.
                let mut j = i + 1;
                while j < bytes.len() && bytes[j] != b'\n' {
                    if bytes[j] == b'\'' {
                        if bytes.get(j + 1) == Some(&b'\'') {
                            j += 2;
                            continue;
                        }
                        break;
                    }
                    j += 1;
                }
                blank(&mut out, i + 1..j.min(bytes.len()));
                i = j + 1;
            }
            _ => i += 1,
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn find_from(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

fn skip_ws(text: &str, from: usize) -> usize {
    let from = from.min(text.len());
    from + (text[from..].len() - text[from..].trim_start().len())
}

fn word_at(text: &str, at: usize) -> &str {
    let rest = text.get(at..).unwrap_or("");
    let len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    &rest[..len]
}

fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in text.bytes().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn after_semicolon(text: &str, from: usize) -> usize {
    let at = skip_ws(text, from);
    if text[at..].starts_with(';') { at + 1 } else { from }
}

// A routine keyword right after `=` or `:` names a procedural type.
fn is_type_position(masked: &str, at: usize) -> bool {
    masked[..at]
        .trim_end()
        .ends_with(['=', ':'])
}

fn split_top_level(text: &str, range: Range<usize>) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = range.start;
    for (i, b) in text.bytes().enumerate().take(range.end).skip(range.start) {
        match b {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b';' if depth == 0 => {
                out.push(start..i);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < range.end {
        out.push(start..range.end);
    }
    out
}

fn uses_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(|entry| {
            let entry = entry.trim();
            // `Foo in 'Foo.pas'`
            let name = match entry.to_ascii_lowercase().find(" in ") {
                Some(at) => &entry[..at],
                None => entry,
            };
            normalize_ws(name).replace(' ', "")
        })
        .filter(|name| !name.is_empty())
        .collect()
}

fn property(name: &str, rest: &str) -> Property {
    let words: Vec<&str> = rest.split_whitespace().collect();
    let type_end = words
        .iter()
        .position(|w| PROPERTY_SPECIFIERS.iter().any(|s| w.eq_ignore_ascii_case(s)))
        .unwrap_or(words.len());
    let accessor = |spec: &str| {
        words
            .iter()
            .position(|w| w.eq_ignore_ascii_case(spec))
            .and_then(|at| words.get(at + 1))
            .map(|w| w.to_string())
    };
    Property {
        name: name.to_string(),
        type_name: words[..type_end].join(" "),
        read: accessor("read"),
        write: accessor("write"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(src: &str) -> Unit {
        Scanner::new().unwrap().scan(src, "Fallback")
    }

    #[test]
    fn shared_scanner_is_compiled_once() {
        let a = Scanner::shared().unwrap();
        let b = Scanner::shared().unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(a.scan("unit Shared;\nend.", "X").name, "Shared");
    }

    #[test]
    fn masking_keeps_offsets() {
        let src = "a { begin } b 'end''s' // end\nc (* x *)";
        let masked = mask(src);
        assert_eq!(masked.len(), src.len());
        assert!(!masked.contains("begin"));
        assert!(!masked.contains("end"));
        assert_eq!(masked.find('c'), src.find("\nc").map(|i| i + 1));
    }

    #[test]
    fn class_members_in_order() {
        let unit = scan(
            r#"unit Model;
interface
type
  TPerson = class(TPersistent)
  private
    cID, cClient: Integer;
    cFirst: string; // given name
  public
    constructor Create(AFirst: string);
    function FullName: string; virtual;
    property First: string read cFirst write cFirst;
  end;
implementation
end."#,
        );
        assert_eq!(unit.name, "Model");
        let class = &unit.classes[0];
        assert_eq!(class.name, "TPerson");
        assert_eq!(class.ancestor.as_deref(), Some("TPersistent"));
        let fields: Vec<_> = class.fields.iter().map(|f| (f.name.as_str(), f.type_name.as_str())).collect();
        assert_eq!(fields, vec![("cID", "Integer"), ("cClient", "Integer"), ("cFirst", "string")]);
        assert_eq!(class.methods.len(), 2);
        assert_eq!(class.methods[0].kind, ProcKind::Constructor);
        assert_eq!(class.methods[1].return_type, "string");
        assert_eq!(class.properties[0].write.as_deref(), Some("cFirst"));
    }

    #[test]
    fn body_skips_nested_routines_and_blocks() {
        let unit = scan(
            r#"program P;
procedure Outer(A: Integer);
var
  R: record X: Integer; end;
  procedure Inner;
  begin
    Writeln('begin');
  end;
begin
  try
    case A of 1: Inner; end;
  finally
    Inner;
  end;
end;

begin
  Outer(1);
end."#,
        );
        assert_eq!(unit.procedures.len(), 1);
        let outer = &unit.procedures[0];
        assert!(outer.has_body);
        assert!(outer.body.starts_with("try"));
        assert!(outer.body.ends_with("end;"));
        assert!(outer.statements.is_empty());
    }

    #[test]
    fn external_routines_have_no_body() {
        let unit = scan("unit U;\ninterface\nimplementation\nfunction Beep(F: Integer): Boolean; stdcall; external 'kernel32.dll';\nprocedure Run;\nbegin\n  Beep(1);\nend;\nend.");
        let names: Vec<_> = unit.procedures.iter().map(|p| (p.name.as_str(), p.has_body)).collect();
        assert_eq!(names, vec![("Beep", false), ("Run", true)]);
        assert_eq!(unit.procedures[1].body, "Beep(1);");
    }

    #[test]
    fn text_without_declarations_is_an_empty_unit() {
        let unit = scan("just some words; nothing Pascal-like");
        assert_eq!(unit.name, "Fallback");
        assert!(unit.is_empty());
    }
}
