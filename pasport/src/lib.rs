#![forbid(unsafe_code)]

//! Batch driver: configuration, the per-unit front end, semantic analysis and
//! IR output for a set of Pascal sources.

pub mod manifest;
pub mod pipeline;
pub mod report;

pub use manifest::{ConfigError, ResolvedConfig, find_config, load_config, load_config_file, parse_config};
pub use pipeline::{BatchDiagnostic, BatchOutcome, BatchStatus, BuiltUnit, Pipeline, UnitFailure, read_source};
pub use report::{BatchReport, write_outputs};
