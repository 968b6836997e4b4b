//! Command-line interface for trainprep
//!
//! Provides `config` and `prepare` subcommands wrapping the config merger
//! and the dataset record writer.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod prepare;

/// Prepare detection training runs
#[derive(Parser)]
#[command(name = "trainprep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge pipeline config fragments into one generated config file
    Config(config::ConfigArgs),

    /// Convert a labeled image directory into sharded record datasets
    Prepare(prepare::PrepareArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Wire verbose flag to the tracing log level.
    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Commands::Config(args) => config::run(args),
        Commands::Prepare(args) => prepare::run(args),
    }
}
