#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use pasport_ast::Unit;
use pasport_core::{IrDocuments, SemanticContext, lower_all};
use pasport_parse::{BuildOutput, ParseError, Strategy, build_unit};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::manifest::ResolvedConfig;

/// A source file that produced no unit. The rest of the batch is unaffected.
#[derive(Clone, Debug, Error, Diagnostic)]
#[error("unit `{unit}` ({}) failed: {message}", path.display())]
#[diagnostic(code(pasport::unit))]
pub struct UnitFailure {
    pub path: PathBuf,
    /// File stem; the unit header was never read.
    pub unit: String,
    pub message: String,
}

/// Problems with the batch as a whole. Reported once; processing continues.
#[derive(Clone, Debug, PartialEq, Eq, Error, Diagnostic)]
pub enum BatchDiagnostic {
    #[error("input path {} does not exist", .0.display())]
    #[diagnostic(code(pasport::batch::missing_input), severity(Warning))]
    MissingInput(PathBuf),

    #[error("no input paths given")]
    #[diagnostic(code(pasport::batch::empty_input), severity(Warning))]
    EmptyInput,

    #[error("no source files found")]
    #[diagnostic(code(pasport::batch::no_sources), severity(Warning))]
    NoSources,

    #[error("duplicate unit `{unit}` in {}; first defined in {}", path.display(), first.display())]
    #[diagnostic(code(pasport::batch::duplicate_unit), severity(Warning))]
    DuplicateUnit {
        unit: String,
        path: PathBuf,
        first: PathBuf,
    },
}

/// A unit that made it through the front end.
#[derive(Clone, Debug)]
pub struct BuiltUnit {
    pub path: PathBuf,
    pub unit: Unit,
    pub strategy: Strategy,
    pub errors: Vec<ParseError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchStatus {
    Success,
    Failure,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub units: Vec<BuiltUnit>,
    pub failures: Vec<UnitFailure>,
    pub diagnostics: Vec<BatchDiagnostic>,
    pub context: SemanticContext,
    pub documents: IrDocuments,
}

impl BatchOutcome {
    pub fn status(&self) -> BatchStatus {
        if self.units.is_empty() {
            BatchStatus::Failure
        } else {
            BatchStatus::Success
        }
    }
}

pub struct Pipeline {
    config: ResolvedConfig,
}

impl Pipeline {
    pub fn new(config: ResolvedConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn run(&self, inputs: &[PathBuf]) -> BatchOutcome {
        self.run_with(inputs, build_unit)
    }

    /// Like [`Pipeline::run`], with `build` turning each file's text into a unit.
    /// It receives the source, the file stem and the configured strategy.
    pub fn run_with<F>(&self, inputs: &[PathBuf], build: F) -> BatchOutcome
    where
        F: Fn(&str, &str, Strategy) -> BuildOutput + Sync,
    {
        let mut outcome = BatchOutcome::default();
        let files = self.expand_inputs(inputs, &mut outcome.diagnostics);

        let strategy = self.config.strategy;
        let results: Vec<Result<BuiltUnit, UnitFailure>> = files
            .par_iter()
            .map(|path| front_end(path, strategy, &build))
            .collect();

        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        for result in results {
            match result {
                Ok(built) => {
                    let key = built.unit.name.to_ascii_lowercase();
                    if let Some(first) = seen.get(&key) {
                        let diag = BatchDiagnostic::DuplicateUnit {
                            unit: built.unit.name.clone(),
                            path: built.path.clone(),
                            first: first.clone(),
                        };
                        warn!("{diag}");
                        outcome.diagnostics.push(diag);
                        continue;
                    }
                    seen.insert(key, built.path.clone());
                    outcome.units.push(built);
                }
                Err(failure) => {
                    error!(path = %failure.path.display(), unit = %failure.unit, "{}", failure.message);
                    outcome.failures.push(failure);
                }
            }
        }

        let mut ctx = SemanticContext::with_rules(self.config.rules.clone());
        for built in &outcome.units {
            ctx.load(built.unit.clone());
        }
        ctx.analyze();
        outcome.documents = lower_all(&ctx, &self.config.lowering);
        outcome.context = ctx;

        info!(
            units = outcome.units.len(),
            failures = outcome.failures.len(),
            entities = outcome.documents.entities.entities.len(),
            backend = outcome.documents.backend.procedures.len(),
            ui = outcome.documents.ui.ui_actions.len(),
            "batch finished"
        );
        outcome
    }

    /// Files to process, in a stable order. Directories are walked recursively.
    pub fn expand_inputs(&self, inputs: &[PathBuf], diagnostics: &mut Vec<BatchDiagnostic>) -> Vec<PathBuf> {
        if inputs.is_empty() {
            warn!("{}", BatchDiagnostic::EmptyInput);
            diagnostics.push(BatchDiagnostic::EmptyInput);
            return Vec::new();
        }
        let mut files = Vec::new();
        for input in inputs {
            if input.is_dir() {
                let mut found = Vec::new();
                self.walk(input, &mut found);
                found.sort();
                files.extend(found);
            } else if input.is_file() {
                files.push(input.clone());
            } else {
                let diag = BatchDiagnostic::MissingInput(input.clone());
                warn!("{diag}");
                diagnostics.push(diag);
            }
        }
        if files.is_empty() {
            warn!("{}", BatchDiagnostic::NoSources);
            diagnostics.push(BatchDiagnostic::NoSources);
        }
        debug!(files = files.len(), "inputs expanded");
        files
    }

    fn walk(&self, dir: &Path, out: &mut Vec<PathBuf>) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), "cannot read directory: {e}");
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                self.walk(&path, out);
            } else if self.config.accepts(&path) {
                out.push(path);
            }
        }
    }
}

fn unit_id(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unnamed")
        .to_string()
}

/// Reads a source file. Non-UTF-8 bytes become replacement characters.
pub fn read_source(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Read, parse and build one file. Panics are caught and reported like I/O errors.
fn front_end<F>(path: &Path, strategy: Strategy, build: &F) -> Result<BuiltUnit, UnitFailure>
where
    F: Fn(&str, &str, Strategy) -> BuildOutput,
{
    let unit = unit_id(path);
    let failure = |message: String| UnitFailure {
        path: path.to_path_buf(),
        unit: unit.clone(),
        message,
    };

    let src = read_source(path).map_err(|e| failure(format!("cannot read file: {e}")))?;

    let out = panic::catch_unwind(AssertUnwindSafe(|| build(&src, &unit, strategy))).map_err(|payload| {
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        failure(format!("front end panicked: {detail}"))
    })?;

    debug!(path = %path.display(), unit = %out.unit.name, strategy = %out.strategy, errors = out.errors.len(), "unit built");
    Ok(BuiltUnit {
        path: path.to_path_buf(),
        unit: out.unit,
        strategy: out.strategy,
        errors: out.errors,
    })
}
