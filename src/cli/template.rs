//! Template command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::config::TilecacheConfig;
use crate::session::Session;
use crate::template::TilesetStatus;

use super::{EXIT_ERROR, EXIT_SUCCESS};

/// Execute the template command
pub fn run_template(config: &TilecacheConfig, file: &Path) -> ExitCode {
    let mut config = config.clone();
    config.watch.enabled = false;
    let mut session = Session::new(&config);

    let templates = match session.template_manager() {
        Ok(templates) => templates,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let id = templates.load_object_template(file);
    let Some(template) = templates.get(id) else {
        return ExitCode::from(EXIT_ERROR);
    };
    let Some(object) = template.object() else {
        eprintln!("Error: unable to load template {}", file.display());
        return ExitCode::from(EXIT_ERROR);
    };

    println!("Template: {}", file.display());
    println!("  Name:     {}", object.name);
    if !object.class.is_empty() {
        println!("  Class:    {}", object.class);
    }
    println!("  Size:     {}x{}", object.width, object.height);
    if let Some(gid) = object.tile_gid() {
        println!("  Tile:     {}", gid);
    }
    for property in &object.properties {
        println!("  Property: {} ({}) = {}", property.name, property.kind, property.value);
    }

    match templates.tileset_status(id) {
        TilesetStatus::NoTileset => {}
        TilesetStatus::Ok => {
            if let Some(tileset) = template.tileset() {
                println!("  Tileset:  {}", tileset.source.display());
            }
        }
        TilesetStatus::Missing(path) => {
            println!("  Tileset:  {} (missing)", path.display());
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}
