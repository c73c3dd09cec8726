//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod cut;
mod template;
mod thumbnail;
mod watch;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use glob::glob;

use crate::config::{load_config, TilecacheConfig};

pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// tilecache - Cut tile sheets, render map thumbnails and inspect templates
#[derive(Parser)]
#[command(name = "tilecache")]
#[command(about = "Cut tile sheets, render map thumbnails and inspect object templates")]
#[command(version)]
pub struct Cli {
    /// Path to tilecache.toml (default: discovered from the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cut a tile sheet into individual tile images
    Cut {
        /// Tile sheet image
        sheet: PathBuf,

        /// Tile width in pixels
        #[arg(long)]
        tile_width: u32,

        /// Tile height in pixels
        #[arg(long)]
        tile_height: u32,

        /// Border around the tiles in pixels
        #[arg(long, default_value = "0")]
        margin: u32,

        /// Gap between tiles in pixels
        #[arg(long, default_value = "0")]
        spacing: u32,

        /// Color to make transparent (e.g., "#ff00ff", "magenta")
        #[arg(long)]
        transparent_color: Option<String>,

        /// Output directory for tile_<n>.png files
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Render an image or map file to PNG
    Thumbnail {
        /// Image or map (.json, .tmj) file
        input: PathBuf,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show a template's object and tileset status
    Template {
        /// Template file (.tj)
        file: PathBuf,
    },
    /// Load templates and report reloads as their files change
    Watch {
        /// Template files or glob patterns
        #[arg(required = true)]
        patterns: Vec<String>,
    },
}

/// Expand glob patterns into file paths. Patterns without matches are kept
/// as literal paths.
pub(crate) fn expand_patterns(patterns: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for pattern in patterns {
        let matches: Vec<PathBuf> = match glob(pattern) {
            Ok(paths) => paths.filter_map(Result::ok).collect(),
            Err(_) => Vec::new(),
        };
        if matches.is_empty() {
            files.push(PathBuf::from(pattern));
        } else {
            files.extend(matches);
        }
    }
    files
}

fn init_tracing(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn config_or_exit(path: Option<&Path>) -> Result<TilecacheConfig, ExitCode> {
    load_config(path).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_ERROR)
    })
}

/// Run the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match config_or_exit(cli.config.as_deref()) {
        Ok(config) => config,
        Err(code) => return code,
    };

    match cli.command {
        Commands::Cut {
            sheet,
            tile_width,
            tile_height,
            margin,
            spacing,
            transparent_color,
            output,
        } => cut::run_cut(
            &config,
            &sheet,
            tile_width,
            tile_height,
            margin,
            spacing,
            transparent_color.as_deref(),
            &output,
        ),
        Commands::Thumbnail { input, output } => {
            thumbnail::run_thumbnail(&config, &input, &output)
        }
        Commands::Template { file } => template::run_template(&config, &file),
        Commands::Watch { patterns } => watch::run_watch(&config, &patterns),
    }
}
