#![forbid(unsafe_code)]

//! Projections from an analyzed [`SemanticContext`] into the three IR documents.
//!
//! Builders only read the context. Output order follows registry and
//! procedure order, so a fixed unit order gives identical documents.

mod backend;
mod entity;
mod naming;
mod ui;

use indexmap::IndexMap;
use pasport_ir::{BackendIr, EntityModel, UiModel};

use crate::SemanticContext;

pub use backend::BackendBuilder;
pub use entity::EntityModelBuilder;
pub use naming::{TypeMap, normalize_field_name};
pub use ui::UiSemanticMapper;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoweringOptions {
    /// Classes whose qualified name contains any of these are not entities.
    pub exclusions: Vec<String>,
    pub type_map: TypeMap,
    /// Write token to the actions it expands to.
    pub actions: IndexMap<String, Vec<String>>,
    /// Field names left out of UI forms (exact match).
    pub identity_fields: Vec<String>,
}

impl Default for LoweringOptions {
    fn default() -> Self {
        let mut actions = IndexMap::new();
        actions.insert(
            "Module.mtPerson".to_string(),
            ["open mtPerson", "append row", "write Person fields", "commit"]
                .map(String::from)
                .to_vec(),
        );
        Self {
            exclusions: vec!["Form".to_string(), "View".to_string()],
            type_map: TypeMap::default(),
            actions,
            identity_fields: vec!["cID".to_string(), "cClient".to_string()],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IrDocuments {
    pub entities: EntityModel,
    pub backend: BackendIr,
    pub ui: UiModel,
}

/// Runs all three builders over an analyzed context.
pub fn lower_all(ctx: &SemanticContext, options: &LoweringOptions) -> IrDocuments {
    IrDocuments {
        entities: EntityModelBuilder::new(options).build(ctx),
        backend: BackendBuilder::new(options).build(ctx),
        ui: UiSemanticMapper::new(options).build(ctx),
    }
}
