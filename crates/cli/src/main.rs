// dualsent CLI - cross-validate two sentiment classifiers over a location catalog

mod exit_codes;
mod run;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "dualsent")]
#[command(about = "Join and compare two sentiment classifiers' per-location results")]
#[command(long_version = LONG_VERSION)]
#[command(version)]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline over every location in the catalog
    #[command(after_help = "\
Examples:
  dualsent run pipeline.toml
  dualsent run pipeline.toml --json
  dualsent run pipeline.toml --output report.json --export-dir out/
  dualsent run pipeline.toml --workers 4 -v")]
    Run {
        /// Path to the pipeline .toml config
        config: PathBuf,

        /// Output the JSON report to stdout instead of only the human summary
        #[arg(long)]
        json: bool,

        /// Write the JSON report to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write CSV exports here (overrides [output] dir)
        #[arg(long, value_name = "DIR")]
        export_dir: Option<PathBuf>,

        /// Worker threads, 0 = one per core (overrides [run] workers)
        #[arg(long, env = "DUALSENT_WORKERS")]
        workers: Option<usize>,
    },

    /// Validate a pipeline config and its catalog without reading result tables
    #[command(after_help = "\
Examples:
  dualsent validate pipeline.toml")]
    Validate {
        /// Path to the pipeline .toml config
        config: PathBuf,
    },

    /// List the catalog's locations and which result tables exist for them
    #[command(after_help = "\
Examples:
  dualsent catalog pipeline.toml
  dualsent catalog pipeline.toml --json")]
    Catalog {
        /// Path to the pipeline .toml config
        config: PathBuf,

        /// Output JSON to stdout instead of a table
        #[arg(long)]
        json: bool,
    },
}

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nengine:  dualsent-recon ",
    env!("CARGO_PKG_VERSION"),
);

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            eprintln!("Usage: dualsent <command> [options]");
            eprintln!("       dualsent --help for more information");
            Err(CliError { code: EXIT_USAGE, message: String::new(), hint: None })
        }
        Some(Commands::Run { config, json, output, export_dir, workers }) => {
            run::cmd_run(config, json, output, export_dir, workers)
        }
        Some(Commands::Validate { config }) => run::cmd_validate(config),
        Some(Commands::Catalog { config, json }) => run::cmd_catalog(config, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
