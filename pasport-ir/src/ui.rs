#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiModel {
    pub ui_actions: Vec<UiAction>,
}

/// One event handler: the form it collects and the backend call it triggers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiAction {
    pub name: String,
    /// `"submit"` when bound to a backend call, `"event"` otherwise.
    pub kind: String,
    pub form: UiForm,
    pub backend_call: BackendCall,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiForm {
    pub entity: String,
    pub fields: Vec<UiField>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl UiField {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendCall {
    pub procedure: String,
    pub arguments: Vec<CallArgument>,
}

impl BackendCall {
    pub fn is_bound(&self) -> bool {
        !self.procedure.is_empty() && self.procedure != crate::UNKNOWN
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallArgument {
    #[serde(rename = "type")]
    pub type_name: String,
    pub source: String,
}
