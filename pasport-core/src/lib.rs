#![forbid(unsafe_code)]

//! Semantic enrichment of parsed units and lowering into IR documents.

mod context;
mod effects;
pub mod lower;
mod types;

pub use context::{SemanticContext, SemanticProcedure};
pub use effects::{Effect, EffectRule, EffectRules, Trigger};
pub use lower::{
    BackendBuilder, EntityModelBuilder, IrDocuments, LoweringOptions, TypeMap, UiSemanticMapper,
    lower_all, normalize_field_name,
};
pub use types::{QualifiedName, SemanticType, is_builtin, simple_name};
