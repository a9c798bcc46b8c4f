//! Binary entry point for cellgc.
//!
//! This binary provides the CLI interface for checking and previewing
//! column-family GC policies.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use cellgc::config::CellgcConfig;
use cellgc::observability::{self, LoggingConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// cellgc - GC rule engine for column-family stores.
#[derive(Parser)]
#[command(name = "cellgc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "CELLGC_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Where a command takes its GC rule from.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct RuleSource {
    /// GC policy text, e.g. "maxversions=10 or (maxversions=2 and maxage=5d)".
    #[arg(short, long)]
    policy: Option<String>,

    /// Column family whose policy is read from the config file.
    #[arg(short, long)]
    family: Option<String>,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Decide whether a single cell would be dropped.
    Check {
        #[command(flatten)]
        rule: RuleSource,

        /// Age of the cell, e.g. "6d" or "36h".
        #[arg(short, long)]
        age: String,

        /// Version rank of the cell (1 = newest).
        #[arg(short, long)]
        rank: u64,
    },

    /// Validate a policy and show its normalized form.
    Validate {
        #[command(flatten)]
        rule: RuleSource,
    },

    /// Preview compaction of one column from the ages of its versions.
    Plan {
        #[command(flatten)]
        rule: RuleSource,

        /// Ages of every stored version, comma-separated (e.g. "1h,3d,6d").
        #[arg(long, value_delimiter = ',', required = true)]
        ages: Vec<String>,

        /// Report what would be dropped without acting on it.
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CellgcConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let logging = LoggingConfig::from_settings(Some(&config.logging), cli.verbose);
    if let Err(e) = observability::init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(command: Commands, config: &CellgcConfig) -> anyhow::Result<()> {
    match command {
        Commands::Check { rule, age, rank } => commands::cmd_check(config, &rule, &age, rank),
        Commands::Validate { rule } => commands::cmd_validate(config, &rule),
        Commands::Plan {
            rule,
            ages,
            dry_run,
        } => commands::cmd_plan(config, &rule, &ages, dry_run),
    }
}
