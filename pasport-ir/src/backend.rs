#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendIr {
    pub procedures: Vec<BackendProcedure>,
}

impl BackendIr {
    pub fn procedure(&self, name: &str) -> Option<&BackendProcedure> {
        self.procedures.iter().find(|p| p.name == name)
    }
}

/// A procedure with data side effects, as an ordered list of actions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendProcedure {
    pub name: String,
    pub params: Vec<BackendParam>,
    pub actions: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendParam {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl BackendParam {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_shape() {
        let ir = BackendIr {
            procedures: vec![BackendProcedure {
                name: "AddPerson".into(),
                params: vec![BackendParam::new("APerson", "Model.TPerson")],
                actions: vec!["open mtPerson".into(), "commit".into()],
            }],
        };
        let json = serde_json::to_value(&ir).unwrap();
        assert_eq!(json["procedures"][0]["params"][0]["type"], "Model.TPerson");
        assert_eq!(json["procedures"][0]["actions"][1], "commit");
        assert!(ir.procedure("AddPerson").is_some());
    }
}
