//! Grid set inspection.

use std::fmt::Write;

use clap::Args;
use gridcache::bbox::BoundingBox;
use gridcache::grid::{
    GridSet, GridSetDefinition, GridSetFactory, Resolutions, Srs, DEFAULT_TILE_SIZE,
};

use crate::error::CliError;

/// Arguments for the `gridset` command.
#[derive(Debug, Args)]
pub struct GridSetArgs {
    /// Grid set name
    #[arg(long, default_value = "custom")]
    pub name: String,

    /// Extent as minx,miny,maxx,maxy in SRS units
    #[arg(long, allow_hyphen_values = true)]
    pub extent: BoundingBox,

    /// Spatial reference system, e.g. EPSG:4326
    #[arg(long, default_value = "EPSG:4326")]
    pub srs: Srs,

    /// Number of zoom levels; level 0 is fitted to the extent
    #[arg(long, required_unless_present_any = ["resolutions", "scales"])]
    pub levels: Option<u32>,

    /// Comma separated resolutions in map units per pixel
    #[arg(long, value_delimiter = ',', conflicts_with_all = ["levels", "scales"])]
    pub resolutions: Option<Vec<f64>>,

    /// Comma separated scale denominators
    #[arg(long, value_delimiter = ',', conflicts_with_all = ["levels", "resolutions"])]
    pub scales: Option<Vec<f64>>,

    /// Tile width and height in pixels
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    pub tile_size: u32,

    /// Anchor the grid at the top left corner instead of the bottom left
    #[arg(long)]
    pub top_left: bool,
}

impl GridSetArgs {
    fn definition(&self) -> Result<GridSetDefinition, CliError> {
        let levels = match (&self.resolutions, &self.scales, self.levels) {
            (Some(resolutions), _, _) => Resolutions::Explicit(resolutions.clone()),
            (None, Some(scales), _) => Resolutions::ScaleDenominators(scales.clone()),
            (None, None, Some(levels)) => Resolutions::Levels(levels),
            (None, None, None) => {
                return Err(CliError::InvalidArgument(
                    "one of --levels, --resolutions or --scales is required".to_string(),
                ))
            }
        };

        Ok(
            GridSetDefinition::new(self.name.as_str(), self.srs, self.extent, levels)
                .with_tile_size(self.tile_size, self.tile_size)
                .aligned_top_left(self.top_left),
        )
    }
}

/// Run the `gridset` command.
pub fn run(args: GridSetArgs) -> Result<(), CliError> {
    let grid_set = GridSetFactory::create_grid_set(args.definition()?)?;
    print!("{}", render(&grid_set));
    Ok(())
}

/// Human-readable description of a grid set, one line per level.
pub fn render(grid_set: &GridSet) -> String {
    let mut out = String::new();
    let (origin_x, origin_y) = grid_set.base_coords();
    let _ = writeln!(out, "Grid set: {} ({})", grid_set.name(), grid_set.srs());
    let _ = writeln!(out, "Extent:   {}", grid_set.bounds());
    let _ = writeln!(
        out,
        "Tiles:    {}x{} px, origin {},{} ({})",
        grid_set.tile_width(),
        grid_set.tile_height(),
        origin_x,
        origin_y,
        if grid_set.is_top_left_aligned() {
            "top left"
        } else {
            "bottom left"
        }
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<6} {:<24} {:<20} {:>12}  {}",
        "Level", "Resolution", "Scale", "Tiles", "Name"
    );

    for (level, grid) in grid_set.grids().iter().enumerate() {
        let (wide, high) = grid.extent();
        let _ = writeln!(
            out,
            "{:<6} {:<24} {:<20.2} {:>12}  {}",
            level,
            grid.resolution(),
            grid.scale_denominator(),
            format!("{} x {}", wide, high),
            grid.name()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: GridSetArgs,
    }

    fn parse(argv: &[&str]) -> Result<GridSetArgs, clap::Error> {
        let mut full = vec!["gridcache"];
        full.extend_from_slice(argv);
        TestCli::try_parse_from(full).map(|cli| cli.args)
    }

    #[test]
    fn test_levels_mode() {
        let args = parse(&["--extent", "-180,-90,180,90", "--levels", "3"]).unwrap();
        let grid_set = GridSetFactory::create_grid_set(args.definition().unwrap()).unwrap();

        assert_eq!(grid_set.num_levels(), 3);
        assert_eq!(grid_set.extent(0), Some((2, 1)));

        let text = render(&grid_set);
        assert!(text.starts_with("Grid set: custom (EPSG:4326)"));
        assert!(text.contains("2 x 1"));
        assert!(text.contains("8 x 4"));
    }

    #[test]
    fn test_explicit_resolutions() {
        let args = parse(&[
            "--extent",
            "-20037508.34,-20037508.34,20037508.34,20037508.34",
            "--srs",
            "EPSG:900913",
            "--resolutions",
            "156543.03390625,78271.516953125",
        ])
        .unwrap();
        let grid_set = GridSetFactory::create_grid_set(args.definition().unwrap()).unwrap();

        assert_eq!(grid_set.extent(0), Some((1, 1)));
        assert_eq!(grid_set.extent(1), Some((2, 2)));
    }

    #[test]
    fn test_level_description_is_required() {
        assert!(parse(&["--extent", "0,0,10,10"]).is_err());
        assert!(parse(&["--extent", "0,0,10,10", "--levels", "2", "--resolutions", "1"]).is_err());
    }

    #[test]
    fn test_bad_extent_rejected() {
        assert!(parse(&["--extent", "0,0,10", "--levels", "2"]).is_err());
    }
}
