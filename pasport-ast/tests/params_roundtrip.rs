use pasport_ast::{join_params, parse_params};
use proptest::prelude::*;

#[test]
fn documented_pair_round_trips() {
    let params = parse_params("a : Integer; b : String");
    let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
    let types: Vec<_> = params.iter().map(|p| p.type_name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
    assert_eq!(types, ["Integer", "String"]);

    let joined = join_params(&params);
    assert_eq!(joined, "a : Integer; b : String");
    assert_eq!(parse_params(&joined), params);
}

fn ident() -> impl Strategy<Value = String> {
    "[A-Z][A-Za-z0-9_]{0,8}"
}

proptest! {
    #[test]
    fn parse_join_parse_is_stable(groups in prop::collection::vec((ident(), ident()), 0..6)) {
        let raw = groups
            .iter()
            .map(|(n, t)| format!("{n}:{t}"))
            .collect::<Vec<_>>()
            .join(";");
        let first = parse_params(&raw);
        prop_assert_eq!(first.len(), groups.len());
        let second = parse_params(&join_params(&first));
        prop_assert_eq!(first, second);
    }
}
