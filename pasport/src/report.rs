#![forbid(unsafe_code)]

use std::path::Path;

use miette::IntoDiagnostic;
use serde::Serialize;

use crate::pipeline::{BatchOutcome, BatchStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub schema: &'static str,
    pub ok: bool,
    pub units: Vec<UnitReport>,
    pub failures: Vec<FailureReport>,
    pub diagnostics: Vec<DiagnosticReport>,
    pub counts: Counts,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitReport {
    pub name: String,
    pub path: String,
    pub strategy: String,
    pub classes: usize,
    pub procedures: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parse_errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub path: String,
    pub unit: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    pub units: usize,
    pub failures: usize,
    pub entities: usize,
    pub backend_procedures: usize,
    pub ui_actions: usize,
    /// UI actions left with the `Unknown` procedure placeholder.
    pub unbound_ui_actions: usize,
}

impl BatchReport {
    pub fn from_outcome(outcome: &BatchOutcome) -> Self {
        let docs = &outcome.documents;
        Self {
            schema: "pasport.batch-report.v1",
            ok: outcome.status() == BatchStatus::Success,
            units: outcome
                .units
                .iter()
                .map(|u| UnitReport {
                    name: u.unit.name.clone(),
                    path: display_path(&u.path),
                    strategy: u.strategy.to_string(),
                    classes: u.unit.classes.len(),
                    procedures: u.unit.routines().count(),
                    parse_errors: u.errors.iter().map(|e| e.to_string()).collect(),
                })
                .collect(),
            failures: outcome
                .failures
                .iter()
                .map(|f| FailureReport {
                    path: display_path(&f.path),
                    unit: f.unit.clone(),
                    message: f.message.clone(),
                })
                .collect(),
            diagnostics: outcome
                .diagnostics
                .iter()
                .map(|d| DiagnosticReport {
                    code: miette::Diagnostic::code(d)
                        .map(|c| c.to_string())
                        .unwrap_or_default(),
                    message: d.to_string(),
                })
                .collect(),
            counts: Counts {
                units: outcome.units.len(),
                failures: outcome.failures.len(),
                entities: docs.entities.entities.len(),
                backend_procedures: docs.backend.procedures.len(),
                ui_actions: docs.ui.ui_actions.len(),
                unbound_ui_actions: docs
                    .ui
                    .ui_actions
                    .iter()
                    .filter(|a| !a.backend_call.is_bound())
                    .count(),
            },
        }
    }
}

pub fn write_json<T: Serialize>(value: &T, out_path: &Path) -> miette::Result<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).into_diagnostic()?;
    }
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    std::fs::write(out_path, json).into_diagnostic()?;
    Ok(())
}

/// Writes `entities.json`, `backend.json`, `ui.json` and, when asked, `report.json`.
pub fn write_outputs(outcome: &BatchOutcome, dir: &Path, with_report: bool) -> miette::Result<()> {
    let docs = &outcome.documents;
    write_json(&docs.entities, &dir.join("entities.json"))?;
    write_json(&docs.backend, &dir.join("backend.json"))?;
    write_json(&docs.ui, &dir.join("ui.json"))?;
    if with_report {
        write_json(&BatchReport::from_outcome(outcome), &dir.join("report.json"))?;
    }
    Ok(())
}

fn display_path(p: &Path) -> String {
    p.to_string_lossy().replace('\\', "/")
}
