#![forbid(unsafe_code)]

use indexmap::IndexMap;

/// Entity field name for a source field.
///
/// A single lowercase prefix letter in front of an uppercase letter is
/// dropped (`cFirst` becomes `First`), then the leading capitals are
/// lowercased camelCase style: `First` to `first`, `ID` to `id`,
/// `URLPath` to `urlPath`.
pub fn normalize_field_name(name: &str) -> String {
    let bytes = name.as_bytes();
    let stripped = if bytes.len() >= 2 && bytes[0].is_ascii_lowercase() && bytes[1].is_ascii_uppercase() {
        &name[1..]
    } else {
        name
    };

    let chars: Vec<char> = stripped.chars().collect();
    let run = chars.iter().take_while(|c| c.is_ascii_uppercase()).count();
    // Keep the last capital of a run when it starts the next word.
    let lower_upto = if run > 1 && chars.get(run).is_some_and(|c| c.is_ascii_lowercase()) {
        run - 1
    } else {
        run
    };
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| if i < lower_upto { c.to_ascii_lowercase() } else { *c })
        .collect()
}

const INTEGERS: &[&str] = &[
    "Integer", "Int64", "SmallInt", "ShortInt", "LongInt", "Cardinal", "Word", "Byte",
    "LongWord", "UInt64",
];
const DATES: &[&str] = &["TDateTime", "TDate", "TTime"];
const DECIMALS: &[&str] = &["Currency", "Double", "Extended", "Real", "Single", "Comp"];

/// Coarse mapping from Pascal type names to IR field types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeMap {
    // Keyed by lowercased source type name.
    entries: IndexMap<String, String>,
    fallback: String,
}

impl Default for TypeMap {
    fn default() -> Self {
        let mut map = Self::empty();
        for (names, target) in [(INTEGERS, "int"), (DATES, "date"), (DECIMALS, "decimal")] {
            for name in names {
                map.insert(name, target);
            }
        }
        map
    }
}

impl TypeMap {
    /// No mappings; every type maps to `string`.
    pub fn empty() -> Self {
        Self {
            entries: IndexMap::new(),
            fallback: "string".to_string(),
        }
    }

    /// Adds or replaces a mapping.
    pub fn insert(&mut self, source: &str, target: &str) {
        self.entries
            .insert(source.to_ascii_lowercase(), target.to_string());
    }

    pub fn map(&self, source: &str) -> &str {
        self.entries
            .get(&source.trim().to_ascii_lowercase())
            .map_or(self.fallback.as_str(), String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_fields_lose_their_prefix() {
        assert_eq!(normalize_field_name("cFirst"), "first");
        assert_eq!(normalize_field_name("cID"), "id");
        assert_eq!(normalize_field_name("cFirstName"), "firstName");
        assert_eq!(normalize_field_name("FCount"), "fCount");
    }

    #[test]
    fn unprefixed_fields_are_camel_cased() {
        assert_eq!(normalize_field_name("Notes"), "notes");
        assert_eq!(normalize_field_name("URLPath"), "urlPath");
        assert_eq!(normalize_field_name("ID2"), "id2");
        assert_eq!(normalize_field_name("notes"), "notes");
        assert_eq!(normalize_field_name("x"), "x");
        assert_eq!(normalize_field_name(""), "");
    }

    #[test]
    fn type_map_defaults() {
        let map = TypeMap::default();
        assert_eq!(map.map("Integer"), "int");
        assert_eq!(map.map("int64"), "int");
        assert_eq!(map.map("TDateTime"), "date");
        assert_eq!(map.map("Currency"), "decimal");
        assert_eq!(map.map("string"), "string");
        assert_eq!(map.map("TPerson"), "string");
    }

    #[test]
    fn type_map_accepts_additions() {
        let mut map = TypeMap::empty();
        assert_eq!(map.map("Integer"), "string");
        map.insert("Boolean", "bool");
        assert_eq!(map.map("BOOLEAN"), "bool");
        assert_eq!(map.len(), 1);
    }
}
