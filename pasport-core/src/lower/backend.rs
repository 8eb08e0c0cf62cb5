#![forbid(unsafe_code)]

use pasport_ir::{BackendIr, BackendParam, BackendProcedure};
use tracing::debug;

use super::LoweringOptions;
use crate::{SemanticContext, SemanticProcedure};

pub struct BackendBuilder<'o> {
    options: &'o LoweringOptions,
}

impl<'o> BackendBuilder<'o> {
    pub fn new(options: &'o LoweringOptions) -> Self {
        Self { options }
    }

    pub fn build(&self, ctx: &SemanticContext) -> BackendIr {
        let procedures = ctx
            .procedures()
            .iter()
            .filter(|p| !p.is_ui && !p.writes.is_empty())
            .map(|p| self.procedure(p))
            .collect();
        BackendIr { procedures }
    }

    fn procedure(&self, proc: &SemanticProcedure) -> BackendProcedure {
        let mut actions = Vec::new();
        for token in &proc.writes {
            match self.options.actions.get(token) {
                Some(template) => actions.extend(template.iter().cloned()),
                None => debug!(procedure = %proc.name, token = %token, "no actions for write token"),
            }
        }
        BackendProcedure {
            name: proc.name.clone(),
            params: proc
                .parameters
                .iter()
                .map(|(name, ty)| BackendParam::new(name.clone(), ty.type_name()))
                .collect(),
            actions,
        }
    }
}
