#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use pasport::{BatchReport, BatchStatus, Pipeline, ResolvedConfig, load_config, load_config_file, read_source, write_outputs};
use pasport_parse::{Strategy, build_unit};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pasport", version, about = "Lower Pascal/Delphi units into entity, backend and UI models")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StrategyArg {
    /// Walk the parse tree
    Tree,
    /// Regular-expression scanning
    Scan,
    /// Tree, scanning when the source cannot be tokenized
    Auto,
}

impl From<StrategyArg> for Strategy {
    fn from(v: StrategyArg) -> Self {
        match v {
            StrategyArg::Tree => Strategy::Tree,
            StrategyArg::Scan => Strategy::Scan,
            StrategyArg::Auto => Strategy::Auto,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Analyze sources and write entities.json, backend.json and ui.json
    Build {
        /// Source files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory (defaults to `output.dir` from pasport.toml, else ./ir)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Config file (defaults to the nearest pasport.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Also write report.json
        #[arg(long, default_value_t = false)]
        report: bool,
    },
    /// Print one unit's AST as JSON
    Ast {
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = StrategyArg::Auto)]
        strategy: StrategyArg,
    },
    /// Run the pipeline and print the batch report without writing IR
    Check {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
    },
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Cmd::Build {
            inputs,
            out,
            config,
            strategy,
            report,
        } => {
            let config = resolve_config(config.as_deref(), &inputs, strategy)?;
            let pipeline = Pipeline::new(config);
            let out_dir = out.unwrap_or_else(|| pipeline.config().output_dir.clone());
            let outcome = pipeline.run(&inputs);
            if outcome.status() == BatchStatus::Failure {
                return Err(miette::miette!("no unit was processed successfully"));
            }
            write_outputs(&outcome, &out_dir, report)?;
            info!(dir = %out_dir.display(), "IR written");
            Ok(())
        }
        Cmd::Ast { file, strategy } => {
            let src = read_source(&file).into_diagnostic()?;
            let stem = file
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Unnamed");
            let built = build_unit(&src, stem, strategy.into());
            for err in &built.errors {
                warn!(file = %file.display(), "{err}");
            }
            let json = serde_json::to_string_pretty(&built.unit).into_diagnostic()?;
            println!("{json}");
            Ok(())
        }
        Cmd::Check {
            inputs,
            config,
            strategy,
        } => {
            let config = resolve_config(config.as_deref(), &inputs, strategy)?;
            let outcome = Pipeline::new(config).run(&inputs);
            let report = BatchReport::from_outcome(&outcome);
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            if outcome.status() == BatchStatus::Failure {
                return Err(miette::miette!("no unit was processed successfully"));
            }
            Ok(())
        }
    }
}

fn resolve_config(
    explicit: Option<&Path>,
    inputs: &[PathBuf],
    strategy: Option<StrategyArg>,
) -> miette::Result<ResolvedConfig> {
    let mut config = match explicit {
        Some(path) => load_config_file(path)?,
        None => {
            let start = inputs.first().map(PathBuf::as_path).unwrap_or_else(|| Path::new("."));
            load_config(start)?
        }
    };
    if let Some(strategy) = strategy {
        config.strategy = strategy.into();
    }
    if let Some(path) = &config.config_path {
        info!(config = %path.display(), strategy = %config.strategy, "using config");
    }
    Ok(config)
}
