//! Thumbnail command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::config::TilecacheConfig;
use crate::session::Session;

use super::{EXIT_ERROR, EXIT_SUCCESS};

/// Execute the thumbnail command.
///
/// Images are copied through as PNG; maps are rendered.
pub fn run_thumbnail(config: &TilecacheConfig, input: &Path, output: &Path) -> ExitCode {
    let mut session = Session::new(config);
    let image = session.images().load_image(input);

    if image.is_null() {
        eprintln!("Error: {} is neither an image nor a readable map", input.display());
        return ExitCode::from(EXIT_ERROR);
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: cannot create {}: {}", parent.display(), e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = image.image().save(output) {
        eprintln!("Error: failed to write {}: {}", output.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    println!("Saved {}x{} thumbnail to {}", image.width(), image.height(), output.display());
    ExitCode::from(EXIT_SUCCESS)
}
