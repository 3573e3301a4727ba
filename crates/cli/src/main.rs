// bommap CLI - carry supplier data from an old BOM spreadsheet into a new one

mod exit_codes;
mod inspect;
mod map;
mod profile;
mod util;

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "bommap")]
#[command(about = "Map supplier columns from an OLD bill of materials onto a NEW one by part number")]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy transferable fields from OLD rows into NEW rows with the same MPN
    #[command(after_help = "\
Examples:
  bommap map old_bom.xlsx new_bom.xlsx
  bommap map old_bom.xlsx new_bom.xlsx -o mapped.xlsx --preview 10
  bommap map old.csv new.csv -o mapped.csv --json
  bommap map old.xlsx new.xlsx --config vendor.toml --report run.json --strict
  bommap map old.xlsx new.xlsx --sheet-new BOM --new-header-row 4")]
    Map(map::MapArgs),

    /// Show detected header, columns and field resolution for one file
    #[command(after_help = "\
Examples:
  bommap inspect old_bom.xlsx
  bommap inspect new_bom.xlsx --sheet BOM --json
  bommap inspect export.csv --header-row 3")]
    Inspect(inspect::InspectArgs),

    /// Show or validate mapping profiles
    #[command(subcommand)]
    Config(profile::ConfigCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: bommap <command> [options]");
            eprintln!("       bommap --help for more information");
            Err(CliError::new(EXIT_USAGE, ""))
        }
        Some(Commands::Map(args)) => map::cmd_map(args),
        Some(Commands::Inspect(args)) => inspect::cmd_inspect(args),
        Some(Commands::Config(cmd)) => profile::cmd_config(cmd),
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

/// stderr logger. `BOMMAP_LOG` (EnvFilter syntax) wins over -v/-q.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env("BOMMAP_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // try_init also bridges `log` records from the library crates.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .try_init();
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

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
