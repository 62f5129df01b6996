//! w2m: migrate multilingual WXR exports
//!
//! The binary validates an export by running the full import pipeline
//! against an in-memory host.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::FmtSubscriber;
use w2m::config::{Config, LogFormat, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "w2m")]
#[command(about = "Migrate content from multilingual WXR exports")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import users, terms, posts and comments from an export file
    Import {
        /// Path to the WXR export
        #[arg(required = true)]
        path: PathBuf,

        /// Mapping checkpoint file (resumes from it when present)
        #[arg(long)]
        mapping: Option<PathBuf>,

        /// Write the JSON run report here
        #[arg(long)]
        report: Option<PathBuf>,

        /// Maximum items per entity type
        #[arg(long)]
        max_items: Option<usize>,

        /// Quiet mode (no progress output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show mapping checkpoint status
    MappingStatus {
        /// Path to mapping checkpoint file
        mapping: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config)?;

    // Setup logging
    let log_level = config.logging.level.raised(cli.verbose).to_tracing();
    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false);
    match config.logging.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
    }

    match cli.command {
        Commands::Import {
            path,
            mapping,
            report,
            max_items,
            quiet,
        } => commands::import_export(config, path, mapping, report, max_items, quiet),
        Commands::MappingStatus { mapping } => commands::show_mapping_status(mapping),
    }
}
