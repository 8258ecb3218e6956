mod check_constraint;
mod config;
mod resolve;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

use config::OlmConfig;

/// Exit code for unsatisfiable requirements and invalid input
pub const EXIT_INVALID: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "olm-resolve")]
#[command(about = "Resolve operator bundles from a catalog snapshot")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Ignore olm-resolve.toml
    #[arg(long, global = true)]
    no_config: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Select one bundle per package for the given requirements
    Resolve(resolve::ResolveArgs),

    /// Validate an olm.constraint document
    CheckConstraint(check_constraint::CheckConstraintArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over -v
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run() -> Result<i32> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Resolve(resolve_args) => {
            let config = if args.no_config { None } else { OlmConfig::load_from_cwd()? };
            resolve::execute(resolve_args, config.as_ref())
        }
        Commands::CheckConstraint(check_args) => check_constraint::execute(check_args),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
