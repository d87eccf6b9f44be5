//! Binary entry point for framedex.
//!
//! This binary provides the CLI for importing, validating, exporting and
//! counting character, move category and move records.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use framedex::config::{FramedexConfig, StoreBackend};
use framedex::models::RecordKind;
use framedex::observability;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use commands::{cmd_config, cmd_export, cmd_import, cmd_stats, cmd_validate};

/// framedex - CSV bulk import/export for fighting-game reference data.
#[derive(Parser)]
#[command(name = "framedex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "FRAMEDEX_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Store backend: memory, file, or graphql.
    #[arg(long, global = true)]
    backend: Option<StoreBackend>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Import records from a CSV file.
    Import {
        /// Record kind: character, move-category, or move.
        kind: RecordKind,

        /// CSV file to import.
        file: PathBuf,

        /// Delete every existing record of the kind before importing.
        #[arg(long)]
        replace_all: bool,

        /// Validate and count without changing the store.
        #[arg(long)]
        dry_run: bool,
    },

    /// Check a CSV file against the store without importing it.
    Validate {
        /// Record kind: character, move-category, or move.
        kind: RecordKind,

        /// CSV file to check.
        file: PathBuf,
    },

    /// Export every record of a kind to a CSV file.
    Export {
        /// Record kind: character, move-category, or move.
        kind: RecordKind,

        /// Output CSV file.
        file: PathBuf,
    },

    /// Show record counts for every kind in the store.
    Stats,

    /// Manage configuration.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), cli.backend) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    let _observability = match observability::init(&config, cli.verbose) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(command: Commands, config: &FramedexConfig) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Import {
            kind,
            file,
            replace_all,
            dry_run,
        } => cmd_import(config, kind, &file, replace_all, dry_run).await,

        Commands::Validate { kind, file } => cmd_validate(config, kind, &file).await,

        Commands::Export { kind, file } => cmd_export(config, kind, &file).await,

        Commands::Stats => cmd_stats(config).await,

        Commands::Config { show } => {
            cmd_config(config, show);
            Ok(ExitCode::SUCCESS)
        },
    }
}

/// Loads configuration: file, then environment, then `--backend`.
fn load_config(path: Option<&Path>, backend: Option<StoreBackend>) -> anyhow::Result<FramedexConfig> {
    let mut config = match path {
        Some(path) => FramedexConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => FramedexConfig::load_default()?,
    };
    config.apply_env_overrides()?;
    if let Some(backend) = backend {
        config = config.with_backend(backend);
    }
    Ok(config)
}
