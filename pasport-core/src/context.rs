#![forbid(unsafe_code)]

use std::mem;

use indexmap::{IndexMap, IndexSet};
use pasport_ast::{Class, ProcKind, Procedure, Unit};
use tracing::debug;

use crate::effects::EffectRules;
use crate::types::{QualifiedName, SemanticType, is_builtin};

/// A procedure or method with its resolved signature and inferred effects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SemanticProcedure {
    pub name: String,
    pub unit: String,
    /// Declaring class for methods.
    pub owner: Option<String>,
    pub kind: ProcKind,
    pub return_type: String,
    pub parameters: IndexMap<String, SemanticType>,
    pub has_body: bool,
    pub body: String,
    /// `"<param>.*"` tokens.
    pub reads: IndexSet<String>,
    pub writes: IndexSet<String>,
    pub creates: IndexSet<String>,
    pub calls: IndexSet<String>,
    pub is_ui: bool,
}

impl SemanticProcedure {
    fn from_ast(
        unit: &Unit,
        owner: Option<&Class>,
        proc: &Procedure,
        resolve: impl Fn(&str) -> SemanticType,
    ) -> Self {
        let parameters = proc
            .parameters
            .iter()
            .map(|p| (p.name.clone(), resolve(&p.type_name)))
            .collect();
        Self {
            name: proc.name.clone(),
            unit: unit.name.clone(),
            owner: owner.map(|c| c.name.clone()),
            kind: proc.kind,
            return_type: proc.return_type.clone(),
            parameters,
            has_body: proc.has_body,
            body: proc.body.clone(),
            reads: IndexSet::new(),
            writes: IndexSet::new(),
            creates: IndexSet::new(),
            calls: IndexSet::new(),
            is_ui: false,
        }
    }

    /// Parameter name to resolved type name.
    pub fn parameter_types(&self) -> IndexMap<String, String> {
        self.parameters
            .iter()
            .map(|(name, ty)| (name.clone(), ty.type_name()))
            .collect()
    }

    pub fn qualified_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}.{}.{}", self.unit, owner, self.name),
            None => format!("{}.{}", self.unit, self.name),
        }
    }

    pub fn has_effects(&self) -> bool {
        !(self.reads.is_empty()
            && self.writes.is_empty()
            && self.creates.is_empty()
            && self.calls.is_empty())
            || self.is_ui
    }

    fn clear_effects(&mut self) {
        self.reads.clear();
        self.writes.clear();
        self.creates.clear();
        self.calls.clear();
        self.is_ui = false;
    }
}

/// Registries and inferred effects for one batch of units.
///
/// Each step clears and rebuilds what it produces, so running a step again on
/// the same units yields the same result.
#[derive(Clone, Debug, Default)]
pub struct SemanticContext {
    units: Vec<Unit>,
    registry: IndexMap<QualifiedName, SemanticType>,
    procedures: Vec<SemanticProcedure>,
    rules: EffectRules,
}

impl SemanticContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: EffectRules) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    pub fn load(&mut self, unit: Unit) {
        debug!(unit = %unit.name, classes = unit.classes.len(), procedures = unit.procedures.len(), "loading unit");
        self.units.push(unit);
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn registry(&self) -> &IndexMap<QualifiedName, SemanticType> {
        &self.registry
    }

    pub fn procedures(&self) -> &[SemanticProcedure] {
        &self.procedures
    }

    /// First procedure with this name, in unit then declaration order.
    pub fn procedure(&self, name: &str) -> Option<&SemanticProcedure> {
        self.procedures.iter().find(|p| p.name == name)
    }

    pub fn rules(&self) -> &EffectRules {
        &self.rules
    }

    /// Collects types, then procedures, then effects.
    pub fn analyze(&mut self) {
        self.collect_types();
        self.collect_procedures();
        self.infer_effects();
    }

    /// Registers every class of every loaded unit under `Unit.Class`.
    pub fn collect_types(&mut self) {
        self.registry.clear();
        for unit in &self.units {
            for class in &unit.classes {
                let fields = class
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), f.type_name.clone()))
                    .collect();
                self.registry.insert(
                    format!("{}.{}", unit.name, class.name),
                    SemanticType::Class {
                        name: class.name.clone(),
                        fields,
                    },
                );
            }
        }
        debug!(types = self.registry.len(), "type registry built");
    }

    pub fn collect_procedures(&mut self) {
        let mut procedures = Vec::new();
        for unit in &self.units {
            for (owner, proc) in unit.routines() {
                procedures.push(SemanticProcedure::from_ast(unit, owner, proc, |t| {
                    self.resolve_type(t)
                }));
            }
        }
        self.procedures = procedures;
    }

    pub fn infer_effects(&mut self) {
        let known: IndexSet<String> = self.procedures.iter().map(|p| p.name.clone()).collect();
        let classes: IndexSet<&str> = self
            .registry
            .values()
            .filter_map(|t| match t {
                SemanticType::Class { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();

        let mut procedures = mem::take(&mut self.procedures);
        for proc in &mut procedures {
            proc.clear_effects();
            if !proc.has_body {
                continue;
            }
            self.rules.apply(proc);

            let reads: Vec<String> = proc
                .parameters
                .keys()
                .filter(|p| proc.body.contains(&format!("{p}.")))
                .map(|p| format!("{p}.*"))
                .collect();
            proc.reads.extend(reads);

            for class in &classes {
                if proc.body.contains(&format!("{class}.Create")) {
                    proc.creates.insert(class.to_string());
                }
            }
            for name in &known {
                if *name != proc.name && proc.body.contains(&format!("{name}(")) {
                    proc.calls.insert(name.clone());
                }
            }
            debug!(
                procedure = %proc.qualified_name(),
                writes = proc.writes.len(),
                creates = proc.creates.len(),
                calls = proc.calls.len(),
                ui = proc.is_ui,
                "effects inferred"
            );
        }
        self.procedures = procedures;
    }

    /// Resolves a declared type name against the registry.
    ///
    /// A registered class whose qualified name ends in `.declared` wins; when
    /// several do, the first registered one. Built-in names stay as written.
    pub fn resolve_type(&self, declared: &str) -> SemanticType {
        let declared = declared.trim();
        if declared.is_empty() {
            return SemanticType::unresolved("");
        }
        if let Some(element) = array_element(declared) {
            return SemanticType::Array {
                element: Box::new(self.resolve_type(element)),
            };
        }

        let suffix = format!(".{declared}");
        if let Some(qualified) = self.registry.keys().find(|q| q.ends_with(&suffix)) {
            return SemanticType::named(qualified.clone());
        }
        if is_builtin(declared) {
            return SemanticType::named(declared);
        }
        SemanticType::unresolved(declared)
    }

    /// Finds a registered class by simple name: suffix match first, then any
    /// qualified name containing `name`.
    pub fn find_class(&self, name: &str) -> Option<(&QualifiedName, &SemanticType)> {
        let suffix = format!(".{name}");
        self.registry
            .iter()
            .find(|(q, _)| q.ends_with(&suffix))
            .or_else(|| self.registry.iter().find(|(q, _)| q.contains(name)))
    }

    /// `Create`, or the name of any known constructor.
    pub fn is_constructor_call(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case("Create")
            || self
                .procedures
                .iter()
                .any(|p| p.name == name && p.kind == ProcKind::Constructor)
    }
}

// `array of X` and `TArray<X>`.
fn array_element(declared: &str) -> Option<&str> {
    let lower = declared.to_ascii_lowercase();
    if lower.starts_with("array of ") {
        return Some(declared["array of ".len()..].trim());
    }
    if lower.starts_with("tarray<") && declared.ends_with('>') {
        return Some(declared["tarray<".len()..declared.len() - 1].trim());
    }
    None
}

#[cfg(test)]
mod tests {
    use pasport_ast::{Field, Param};

    use super::*;

    fn unit_with_person(unit: &str) -> Unit {
        let mut u = Unit::new(unit);
        let mut person = Class::new("TPerson");
        person.fields.push(Field {
            name: "cFirst".into(),
            type_name: "string".into(),
            ..Field::default()
        });
        u.classes.push(person);
        u
    }

    #[test]
    fn registry_keys_are_qualified() {
        let mut ctx = SemanticContext::new();
        ctx.load(unit_with_person("Model"));
        ctx.collect_types();
        let (key, ty) = ctx.registry().first().unwrap();
        assert_eq!(key, "Model.TPerson");
        assert_eq!(ty.fields().unwrap()["cFirst"], "string");
    }

    #[test]
    fn resolution_prefers_first_registered_suffix_match() {
        let mut ctx = SemanticContext::new();
        ctx.load(unit_with_person("Alpha"));
        ctx.load(unit_with_person("Beta"));
        ctx.collect_types();

        assert_eq!(ctx.resolve_type("TPerson"), SemanticType::named("Alpha.TPerson"));
        assert_eq!(ctx.resolve_type("Integer"), SemanticType::named("Integer"));
        assert_eq!(ctx.resolve_type("TGadget"), SemanticType::unresolved("TGadget"));
        assert_eq!(ctx.resolve_type("TGadget").type_name(), "TGadget");
        assert_eq!(ctx.resolve_type("array of TPerson").type_name(), "array of Alpha.TPerson");
        assert_eq!(ctx.resolve_type("TArray<TPerson>").type_name(), "array of Alpha.TPerson");
    }

    #[test]
    fn suffix_match_requires_a_dot_boundary() {
        let mut ctx = SemanticContext::new();
        ctx.load(unit_with_person("Model"));
        ctx.collect_types();
        // `Model.TPerson` ends with "Person" but not with ".Person".
        assert_eq!(ctx.resolve_type("Person"), SemanticType::unresolved("Person"));
        assert!(ctx.find_class("Person").is_some(), "substring fallback");
    }

    #[test]
    fn parameters_keep_declaration_order() {
        let mut unit = unit_with_person("Model");
        let mut proc = Procedure::heading("Save", ProcKind::Procedure, "", "");
        proc.parameters = vec![
            Param { name: "B".into(), type_name: "TPerson".into() },
            Param { name: "A".into(), type_name: "".into() },
        ];
        unit.procedures.push(proc);

        let mut ctx = SemanticContext::new();
        ctx.load(unit);
        ctx.analyze();
        let save = ctx.procedure("Save").unwrap();
        let types: Vec<_> = save.parameter_types().into_iter().collect();
        assert_eq!(
            types,
            vec![("B".to_string(), "Model.TPerson".to_string()), ("A".to_string(), "object".to_string())]
        );
    }
}
