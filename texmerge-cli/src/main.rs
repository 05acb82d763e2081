//! texmerge CLI - Command-line interface
//!
//! Merges a base texture tree and prioritized mod trees into one output tree.

mod commands;
mod error;
mod ui;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::common::SourceArgs;
use commands::merge::MergeArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "texmerge")]
#[command(version, about = "Priority-ordered texture overlay merge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the base tree and active mods into the output directory
    Merge {
        #[command(flatten)]
        source: SourceArgs,

        /// Plain-text log file
        #[arg(long, value_name = "FILE")]
        log_file: Option<PathBuf>,

        /// Remove the previous output asset directory first
        #[arg(long)]
        clean: bool,

        /// Keep empty directories in the output
        #[arg(long)]
        no_prune: bool,

        /// Log progress instead of drawing a progress bar
        #[arg(long)]
        no_progress: bool,

        /// Debug-level logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// List tiers and file counts without copying anything
    Plan {
        #[command(flatten)]
        source: SourceArgs,

        /// Debug-level logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Write a default configuration file
    Init {
        /// Where to write it (default: <config dir>/texmerge/config.ini)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Merge {
            source,
            log_file,
            clean,
            no_prune,
            no_progress,
            verbose,
        } => commands::merge::run(MergeArgs {
            source,
            log_file,
            clean,
            no_prune,
            no_progress,
            verbose,
        }),
        Commands::Plan { source, verbose } => commands::plan::run(source, verbose),
        Commands::Init { config, force } => commands::init::run(config, force),
    }
}
