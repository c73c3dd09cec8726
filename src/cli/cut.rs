//! Cut command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::color::parse_color;
use crate::config::TilecacheConfig;
use crate::image_cache::TilesheetParameters;
use crate::session::Session;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the cut command
pub fn run_cut(
    config: &TilecacheConfig,
    sheet: &Path,
    tile_width: u32,
    tile_height: u32,
    margin: u32,
    spacing: u32,
    transparent_color: Option<&str>,
    output: &Path,
) -> ExitCode {
    if tile_width == 0 || tile_height == 0 {
        eprintln!("Error: --tile-width and --tile-height must be positive");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let mut params = TilesheetParameters::new(sheet, tile_width, tile_height)
        .with_margin(margin)
        .with_spacing(spacing);

    if let Some(color) = transparent_color {
        match parse_color(color) {
            Ok(color) => params = params.with_transparent_color(color),
            Err(e) => {
                eprintln!("Error: invalid --transparent-color '{}': {}", color, e);
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
        }
    }

    let mut session = Session::new(config);
    let tiles = session.images().cut_tiles(&params);
    if tiles.is_empty() {
        eprintln!("Error: no tiles could be cut from {}", sheet.display());
        return ExitCode::from(EXIT_ERROR);
    }

    if let Err(e) = std::fs::create_dir_all(output) {
        eprintln!("Error: cannot create {}: {}", output.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    for (i, tile) in tiles.iter().enumerate() {
        let path = output.join(format!("tile_{}.png", i));
        if let Err(e) = tile.image().save(&path) {
            eprintln!("Error: failed to write {}: {}", path.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    println!("Cut {} tiles from {} into {}", tiles.len(), sheet.display(), output.display());
    ExitCode::from(EXIT_SUCCESS)
}
