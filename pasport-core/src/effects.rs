#![forbid(unsafe_code)]

//! The marker table driving effect inference.
//!
//! Every rule is a plain, case-sensitive substring test on the raw body text.
//! Generated code depends on the exact marker spelling, so matching is never
//! tokenized or normalized.

use tracing::debug;

use crate::context::SemanticProcedure;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    Contains(String),
    ContainsAny(Vec<String>),
}

impl Trigger {
    pub fn matches(&self, body: &str) -> bool {
        match self {
            Trigger::Contains(marker) => body.contains(marker.as_str()),
            Trigger::ContainsAny(markers) => markers.iter().any(|m| body.contains(m.as_str())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Adds a resource token to the procedure's writes.
    Write(String),
    /// Adds a class name to the procedure's creates.
    Create(String),
    /// Classifies the procedure as UI logic.
    MarkUi,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectRule {
    pub trigger: Trigger,
    pub effect: Effect,
}

impl EffectRule {
    pub fn write(marker: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            trigger: Trigger::Contains(marker.into()),
            effect: Effect::Write(resource.into()),
        }
    }

    pub fn create(marker: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            trigger: Trigger::Contains(marker.into()),
            effect: Effect::Create(class.into()),
        }
    }

    pub fn ui<S: Into<String>>(markers: impl IntoIterator<Item = S>) -> Self {
        Self {
            trigger: Trigger::ContainsAny(markers.into_iter().map(Into::into).collect()),
            effect: Effect::MarkUi,
        }
    }
}

/// Ordered rule list. Rules apply in order; later rules never undo earlier ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectRules {
    rules: Vec<EffectRule>,
}

impl Default for EffectRules {
    fn default() -> Self {
        Self {
            rules: vec![
                EffectRule::write("mtPerson", "Module.mtPerson"),
                EffectRule::create("TPerson.Create", "TPerson"),
                EffectRule::ui(["TEdit", "ShowMessage", "Click"]),
            ],
        }
    }
}

impl EffectRules {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn push(&mut self, rule: EffectRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[EffectRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn apply(&self, proc: &mut SemanticProcedure) {
        for rule in &self.rules {
            if !rule.trigger.matches(&proc.body) {
                continue;
            }
            debug!(procedure = %proc.name, effect = ?rule.effect, "effect rule matched");
            match &rule.effect {
                Effect::Write(resource) => {
                    proc.writes.insert(resource.clone());
                }
                Effect::Create(class) => {
                    proc.creates.insert(class.clone());
                }
                Effect::MarkUi => proc.is_ui = true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_is_case_sensitive_substring() {
        let t = Trigger::Contains("mtPerson".into());
        assert!(t.matches("Module.mtPersonID.Value"));
        assert!(!t.matches("Module.MTPERSON"));

        let any = Trigger::ContainsAny(vec!["TEdit".into(), "Click".into()]);
        assert!(any.matches("btnOkClick(nil)"));
        assert!(!any.matches("click"));
    }

    #[test]
    fn default_table_order() {
        let rules = EffectRules::default();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules.rules()[0].effect, Effect::Write("Module.mtPerson".into()));
        assert_eq!(rules.rules()[2].effect, Effect::MarkUi);
    }
}
