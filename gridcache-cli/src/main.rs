//! gridcache CLI - command-line interface
//!
//! Inspects grid sets and tile paths, and scans or trims the tile cache
//! according to the configured disk quotas.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::gridset::GridSetArgs;
use commands::locate::LocateArgs;
use commands::quota::ScanArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "gridcache")]
#[command(version = gridcache::VERSION)]
#[command(about = "Grid sets and disk quotas for a map tile cache", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a grid set and print its levels
    Gridset(GridSetArgs),
    /// Print the cache path of a tile
    Locate(LocateArgs),
    /// Scan the cache and print the disk usage of each layer
    Scan(ScanArgs),
    /// Evict tiles from layers above their quota
    Evict,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Gridset(args) => commands::gridset::run(args),
        Commands::Locate(args) => commands::locate::run(args, cli.config),
        Commands::Scan(args) => commands::quota::run_scan(args, cli.config),
        Commands::Evict => commands::quota::run_evict(cli.config),
    };

    if let Err(e) = result {
        e.exit();
    }
}
