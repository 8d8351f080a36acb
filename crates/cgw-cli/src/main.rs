//! # cgw CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cgw_cli::catalog::{run_checks, run_regions, ChecksArgs, RegionsArgs};
use cgw_cli::scan::{run_scan, ScanArgs};
use cgw_cli::validate::{run_validate_config, ValidateConfigArgs};

/// Compliance Gateway CLI.
///
/// Lists the check catalog, runs the deployment wizard locally and
/// validates gateway configuration files.
#[derive(Parser, Debug)]
#[command(name = "cgw", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List deployment regions.
    Regions(RegionsArgs),

    /// Print the ordered check plan for a region.
    Checks(ChecksArgs),

    /// Configure, scan and optionally approve a deployment.
    Scan(ScanArgs),

    /// Parse and validate a gateway configuration file.
    ValidateConfig(ValidateConfigArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut stdout = std::io::stdout().lock();
    let result = match cli.command {
        Commands::Regions(args) => run_regions(&args, &mut stdout),
        Commands::Checks(args) => run_checks(&args, &mut stdout),
        Commands::Scan(args) => run_scan(&args, &mut stdout),
        Commands::ValidateConfig(args) => run_validate_config(&args, &mut stdout),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// `RUST_LOG` wins over `-v`. Logs go to stderr so stdout stays parseable.
fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
