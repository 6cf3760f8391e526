//! xd CLI - Documentation cross-reference engine.
//!
//! Provides commands for:
//! - `build`: Process the documentation tree and write the output
//! - `check`: Process the documentation tree and report problems only

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, CheckArgs};
use output::Output;

/// xd - Documentation cross-reference engine.
#[derive(Parser)]
#[command(name = "xd", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process the documentation and write the output.
    Build(BuildArgs),
    /// Process the documentation without writing, failing on any warning.
    Check(CheckArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Build(args) => args.run.verbose,
        Commands::Check(args) => args.run.verbose,
    };

    // RUST_LOG wins; --verbose only changes the default level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Build(args) => args.execute(),
        Commands::Check(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
