// labcanon CLI - builds the canonical cross-lab test catalog

mod exit_codes;
mod output;
mod run;
mod score;

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use labcanon_linkage::LinkageError;
use tracing_subscriber::EnvFilter;

use exit_codes::{linkage_exit_code, EXIT_BUDGET, EXIT_INPUT, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "labcanon")]
#[command(about = "Match two lab test catalogs into one canonical catalog")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log more to stderr (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the canonical catalog from two lab catalogs
    #[command(after_help = "\
Examples:
  labcanon run linkage.toml
  labcanon run linkage.toml --json > catalog.json
  labcanon run --left cdl_tests.json --right dynacare_tests.json --specimens cdl_specimens.json
  labcanon run linkage.toml --threshold 0.4 --output out/catalog.json
  labcanon run linkage.toml --generated-at 2026-01-01T00:00:00Z")]
    Run(run::RunArgs),

    /// Validate a linkage config without running
    #[command(after_help = "\
Examples:
  labcanon validate linkage.toml")]
    Validate {
        /// Path to the linkage TOML config
        config: std::path::PathBuf,
    },

    /// Score one pair of test names and explain the result
    #[command(after_help = "\
Examples:
  labcanon score 'FER #1' 'FERTILITÉ #1'
  labcanon score TSH 'Dosage TSH' --left-code TSH --right-code TSH
  labcanon score Calcium 'CALCIUM, URINE 24 HEURES' --json")]
    Score(score::ScoreArgs),
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  labcanon-linkage ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\noutput_schema: 1",
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  labcanon-linkage ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\noutput_schema: 1",
        )
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => run::cmd_run(args),
        Commands::Validate { config } => run::cmd_validate(config),
        Commands::Score(args) => score::cmd_score(args),
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

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<LinkageError> for CliError {
    fn from(err: LinkageError) -> Self {
        let code = linkage_exit_code(&err);
        let hint = match code {
            EXIT_INPUT => Some("inputs must be JSON arrays of {code, raw_name, type, ...}".to_string()),
            EXIT_BUDGET => Some("raise [budget] limits or split the catalogs".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}
