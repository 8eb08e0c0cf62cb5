#![forbid(unsafe_code)]

use pasport_ir::{EntityDefinition, EntityField, EntityModel};
use tracing::debug;

use super::{LoweringOptions, normalize_field_name};
use crate::SemanticContext;
use crate::types::simple_name;

pub struct EntityModelBuilder<'o> {
    options: &'o LoweringOptions,
}

impl<'o> EntityModelBuilder<'o> {
    pub fn new(options: &'o LoweringOptions) -> Self {
        Self { options }
    }

    pub fn build(&self, ctx: &SemanticContext) -> EntityModel {
        let mut model = EntityModel::default();
        for (qualified, ty) in ctx.registry() {
            if let Some(hit) = self.options.exclusions.iter().find(|x| qualified.contains(x.as_str())) {
                debug!(class = %qualified, exclusion = %hit, "class excluded from entities");
                continue;
            }
            let Some(fields) = ty.fields() else {
                continue;
            };
            model.entities.push(EntityDefinition {
                name: simple_name(qualified).to_string(),
                fields: fields
                    .iter()
                    .map(|(name, declared)| {
                        EntityField::new(normalize_field_name(name), self.options.type_map.map(declared))
                    })
                    .collect(),
            });
        }
        model
    }
}

#[cfg(test)]
mod tests {
    use pasport_ast::{Class, Field, Unit};

    use super::*;

    fn field(name: &str, ty: &str) -> Field {
        Field {
            name: name.into(),
            type_name: ty.into(),
            ..Field::default()
        }
    }

    #[test]
    fn view_classes_are_excluded() {
        let mut unit = Unit::new("Model");
        let mut person = Class::new("TPerson");
        person.fields = vec![field("cID", "Integer"), field("cFirst", "string"), field("Notes", "string")];
        unit.classes.push(person);
        let mut view = Unit::new("PersonView");
        view.classes.push(Class::new("TPersonForm"));

        let mut ctx = SemanticContext::new();
        ctx.load(unit);
        ctx.load(view);
        ctx.analyze();

        let model = EntityModelBuilder::new(&LoweringOptions::default()).build(&ctx);
        assert_eq!(model.entities.len(), 1);
        let person = model.entity("TPerson").unwrap();
        assert_eq!(
            person.fields,
            vec![
                EntityField::new("id", "int"),
                EntityField::new("first", "string"),
                EntityField::new("notes", "string"),
            ]
        );
    }
}
