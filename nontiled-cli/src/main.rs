//! NonTiled CLI - Command-line interface
//!
//! Inspects the requests a non-tiled overlay issues for a viewport and replays
//! scripted map interactions against a headless host.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::config::ConfigCommands;
use commands::simulate::SimulateArgs;
use commands::url::UrlArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "nontiled")]
#[command(version, about = "Single-image map overlays driven from the command line")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: <config dir>/nontiled/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the request key and image URL for a viewport
    Url(UrlArgs),

    /// Replay scripted pans, zooms and resizes against a headless map
    Simulate(SimulateArgs),

    /// Configuration file commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "nontiled=debug,info",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Url(args) => commands::url::run(args, config),
        Commands::Simulate(args) => commands::simulate::run(args, config),
        Commands::Config { action } => commands::config::run(action, config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
