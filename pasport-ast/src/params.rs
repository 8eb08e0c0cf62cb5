#![forbid(unsafe_code)]

use crate::Param;

const MODIFIERS: &[&str] = &["var", "const", "out", "constref"];

/// Parses a flat formal parameter list such as `"a : Integer; var b, c : String"`.
///
/// Groups are separated by `;`, names and type by the first `:`. Several names
/// in one group share the group's type. Parameter modifiers and default values
/// are dropped; an untyped parameter gets an empty type name.
pub fn parse_params(raw: &str) -> Vec<Param> {
    let mut out = Vec::new();
    for group in raw.split(';') {
        let group = strip_modifier(group.trim());
        if group.is_empty() {
            continue;
        }

        let (names, type_name) = match group.split_once(':') {
            Some((names, ty)) => (names, strip_default(ty)),
            None => (group, ""),
        };

        for name in names.split(',') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            out.push(Param {
                name: name.to_string(),
                type_name: type_name.to_string(),
            });
        }
    }
    out
}

/// Inverse of [`parse_params`] for one-name-per-group lists.
pub fn join_params(params: &[Param]) -> String {
    params
        .iter()
        .map(|p| {
            if p.type_name.is_empty() {
                p.name.clone()
            } else {
                format!("{} : {}", p.name, p.type_name)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn strip_modifier(group: &str) -> &str {
    let Some((first, rest)) = group.split_once(char::is_whitespace) else {
        return group;
    };
    let rest = rest.trim_start();
    // `out : Integer` names a parameter `out`; it is not a modifier.
    let names_follow = !rest.starts_with([':', ',']);
    if names_follow && MODIFIERS.iter().any(|m| first.eq_ignore_ascii_case(m)) {
        rest
    } else {
        group
    }
}

fn strip_default(ty: &str) -> &str {
    match ty.split_once('=') {
        Some((ty, _default)) => ty.trim(),
        None => ty.trim(),
    }
}
