#![forbid(unsafe_code)]

use pasport_ir::{BackendCall, CallArgument, UNKNOWN, UiAction, UiField, UiForm, UiModel};
use tracing::warn;

use super::{LoweringOptions, normalize_field_name};
use crate::types::simple_name;
use crate::{SemanticContext, SemanticProcedure, SemanticType};

const FORM_SOURCE: &str = "form";

/// Maps UI procedures to form-submission actions.
pub struct UiSemanticMapper<'o> {
    options: &'o LoweringOptions,
}

impl<'o> UiSemanticMapper<'o> {
    pub fn new(options: &'o LoweringOptions) -> Self {
        Self { options }
    }

    pub fn build(&self, ctx: &SemanticContext) -> UiModel {
        let ui_actions = ctx
            .procedures()
            .iter()
            .filter(|p| p.is_ui)
            .map(|p| self.action(ctx, p))
            .collect();
        UiModel { ui_actions }
    }

    fn action(&self, ctx: &SemanticContext, proc: &SemanticProcedure) -> UiAction {
        let created = proc.creates.first();
        let class = created.and_then(|c| ctx.find_class(c));
        let entity = match (class, created) {
            (Some((qualified, _)), _) => simple_name(qualified).to_string(),
            (None, Some(raw)) => raw.clone(),
            (None, None) => UNKNOWN.to_string(),
        };
        let fields = class
            .and_then(|(_, ty)| ty.fields())
            .map(|fields| {
                fields
                    .iter()
                    .filter(|(name, _)| !self.options.identity_fields.contains(*name))
                    .map(|(name, declared)| {
                        UiField::new(normalize_field_name(name), self.options.type_map.map(declared))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let backend_call = self.backend_call(ctx, proc, &entity);
        let kind = if backend_call.is_bound() { "submit" } else { "event" };
        UiAction {
            name: proc.name.clone(),
            kind: kind.to_string(),
            form: UiForm { entity, fields },
            backend_call,
        }
    }

    fn backend_call(&self, ctx: &SemanticContext, proc: &SemanticProcedure, entity: &str) -> BackendCall {
        let callee = proc
            .calls
            .iter()
            .find(|name| !ctx.is_constructor_call(name))
            .and_then(|name| ctx.procedure(name));
        let Some(callee) = callee else {
            warn!(procedure = %proc.name, entity = %entity, "no backend call bound to UI procedure");
            return BackendCall {
                procedure: UNKNOWN.to_string(),
                arguments: vec![CallArgument {
                    type_name: entity.to_string(),
                    source: FORM_SOURCE.to_string(),
                }],
            };
        };
        BackendCall {
            procedure: callee.name.clone(),
            arguments: callee
                .parameters
                .values()
                .map(|ty| argument(ty, entity))
                .collect(),
        }
    }
}

fn argument(ty: &SemanticType, entity: &str) -> CallArgument {
    let type_name = ty.simple_name();
    let source = if type_name == entity { FORM_SOURCE } else { UNKNOWN };
    CallArgument {
        type_name,
        source: source.to_string(),
    }
}
