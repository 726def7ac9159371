//! Tile path lookup.

use std::path::PathBuf;

use clap::Args;
use gridcache::grid::{GridSetBroker, TileIndex, WORLD_EPSG4326};
use gridcache::storage::{FormatRegistry, TileKey, TilePathGenerator};

use super::common::load_config;
use crate::error::CliError;

/// Arguments for the `locate` command.
#[derive(Debug, Args)]
pub struct LocateArgs {
    /// Layer name
    #[arg(long)]
    pub layer: String,

    /// Grid set name
    #[arg(long, default_value = WORLD_EPSG4326)]
    pub gridset: String,

    #[arg(long)]
    pub x: u64,

    #[arg(long)]
    pub y: u64,

    #[arg(long)]
    pub z: u32,

    /// Tile MIME type
    #[arg(long, default_value = "image/png")]
    pub format: String,

    /// Parameter set id in hex, for parameterized tiles
    #[arg(long, value_parser = parse_hex)]
    pub params: Option<u64>,

    /// Cache root; defaults to the configured cache directory
    #[arg(long)]
    pub root: Option<PathBuf>,
}

fn parse_hex(s: &str) -> Result<u64, String> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|_| format!("'{}' is not a hexadecimal parameter id", s))
}

/// Run the `locate` command.
pub fn run(args: LocateArgs, config: Option<PathBuf>) -> Result<(), CliError> {
    let root = match args.root.clone() {
        Some(root) => root,
        None => load_config(config.as_deref())?.disk_quota.cache_dir,
    };
    println!("{}", locate(&args, root)?.display());
    Ok(())
}

/// Resolve the tile's path below `root`.
///
/// Tiles in a known grid set must lie inside it; other grid set names are
/// addressed without validation.
pub fn locate(args: &LocateArgs, root: PathBuf) -> Result<PathBuf, CliError> {
    let format = FormatRegistry::new().from_mime(&args.format)?;
    let index = TileIndex::new(args.x, args.y, args.z);

    let broker = GridSetBroker::new()?;
    if let Some(grid_set) = broker.get(&args.gridset) {
        let inside = grid_set
            .extent(args.z as usize)
            .is_some_and(|(wide, high)| args.x < wide && args.y < high);
        if !inside {
            return Err(CliError::InvalidArgument(format!(
                "tile {} is outside grid set {}",
                index, args.gridset
            )));
        }
    }

    let mut key = TileKey::new(args.gridset.as_str(), index, format);
    if let Some(params) = args.params {
        key = key.with_parameters(params);
    }
    Ok(TilePathGenerator::new(root).locate(&args.layer, &key).path())
}
