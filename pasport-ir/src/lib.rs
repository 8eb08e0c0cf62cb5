#![forbid(unsafe_code)]

//! The three documents handed to code generators. Each is a plain value that
//! serializes to camelCase JSON and carries no behaviour beyond construction.

pub mod backend;
pub mod entity;
pub mod ui;

pub use backend::{BackendIr, BackendParam, BackendProcedure};
pub use entity::{EntityDefinition, EntityField, EntityModel};
pub use ui::{BackendCall, CallArgument, UiAction, UiField, UiForm, UiModel};

/// Placeholder for a binding that could not be resolved. Generators must
/// report it rather than emit it.
pub const UNKNOWN: &str = "Unknown";
